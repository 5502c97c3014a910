use std::cell::RefCell;
use std::rc::Rc;

use crate::error::SimError;
use crate::grid::SpatialGrid;
use crate::types::Vec2f;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

/// Contract to the host's rendering/physics engine. The core sets intent
/// (velocity, animation keys) and reads back integrated positions; it never
/// reasons about pixels or draw order. `step` performs the host's
/// velocity-to-position integration for the frame; adapters backed by a real
/// physics engine may ignore the passability grid.
pub trait PhysicsPort {
    fn create_body(&mut self, position: Vec2f, size: Vec2f) -> BodyHandle;
    fn destroy_body(&mut self, handle: BodyHandle) -> Result<(), SimError>;
    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2f);
    fn set_position(&mut self, handle: BodyHandle, position: Vec2f);
    fn position(&self, handle: BodyHandle) -> Vec2f;
    fn overlaps(&self, a: BodyHandle, b: BodyHandle) -> bool;
    fn set_collision_enabled(&mut self, handle: BodyHandle, enabled: bool);
    fn play_animation(&mut self, handle: BodyHandle, key: &str);
    fn step(&mut self, dt_ms: u64, grid: &SpatialGrid);
}

/// Fire-and-forget sound effect sink; no return value feeds back into logic.
pub trait AudioPort {
    fn play_effect(&mut self, id: &str);
    fn set_looping(&mut self, id: &str, looping: bool);
}

#[derive(Clone, Debug)]
struct BodyState {
    position: Vec2f,
    size: Vec2f,
    velocity: Vec2f,
    collision_enabled: bool,
    animation: Option<String>,
}

/// Minimal host double used by the simulate binary and the tests: straight
/// integration with axis-separated blocking against the active grid.
#[derive(Debug, Default)]
pub struct HeadlessPhysics {
    bodies: Vec<Option<BodyState>>,
}

impl HeadlessPhysics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_animation(&self, handle: BodyHandle) -> Option<&str> {
        self.bodies
            .get(handle.0 as usize)
            .and_then(|slot| slot.as_ref())
            .and_then(|body| body.animation.as_deref())
    }

    fn body(&self, handle: BodyHandle) -> Option<&BodyState> {
        self.bodies.get(handle.0 as usize).and_then(|slot| slot.as_ref())
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut BodyState> {
        self.bodies
            .get_mut(handle.0 as usize)
            .and_then(|slot| slot.as_mut())
    }
}

impl PhysicsPort for HeadlessPhysics {
    fn create_body(&mut self, position: Vec2f, size: Vec2f) -> BodyHandle {
        self.bodies.push(Some(BodyState {
            position,
            size,
            velocity: Vec2f::ZERO,
            collision_enabled: true,
            animation: None,
        }));
        BodyHandle(self.bodies.len() as u64 - 1)
    }

    fn destroy_body(&mut self, handle: BodyHandle) -> Result<(), SimError> {
        match self.bodies.get_mut(handle.0 as usize) {
            Some(slot @ Some(_)) => {
                *slot = None;
                Ok(())
            }
            _ => Err(SimError::ResourceTeardown(format!("body {}", handle.0))),
        }
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec2f) {
        if let Some(body) = self.body_mut(handle) {
            body.velocity = velocity;
        }
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec2f) {
        if let Some(body) = self.body_mut(handle) {
            body.position = position;
        }
    }

    fn position(&self, handle: BodyHandle) -> Vec2f {
        self.body(handle).map(|body| body.position).unwrap_or_default()
    }

    fn overlaps(&self, a: BodyHandle, b: BodyHandle) -> bool {
        let (Some(a), Some(b)) = (self.body(a), self.body(b)) else {
            return false;
        };
        if !a.collision_enabled || !b.collision_enabled {
            return false;
        }
        let width_hit = (a.position.x - b.position.x).abs() < (a.size.x + b.size.x) * 0.5;
        let height_hit = (a.position.y - b.position.y).abs() < (a.size.y + b.size.y) * 0.5;
        width_hit && height_hit
    }

    fn set_collision_enabled(&mut self, handle: BodyHandle, enabled: bool) {
        if let Some(body) = self.body_mut(handle) {
            body.collision_enabled = enabled;
        }
    }

    fn play_animation(&mut self, handle: BodyHandle, key: &str) {
        if let Some(body) = self.body_mut(handle) {
            body.animation = Some(key.to_string());
        }
    }

    fn step(&mut self, dt_ms: u64, grid: &SpatialGrid) {
        let dt_sec = dt_ms as f32 / 1000.0;
        for slot in &mut self.bodies {
            let Some(body) = slot else {
                continue;
            };
            let step_x = Vec2f {
                x: body.position.x + body.velocity.x * dt_sec,
                y: body.position.y,
            };
            if !body.collision_enabled || grid.passable(step_x.to_tile()) {
                body.position = step_x;
            }
            let step_y = Vec2f {
                x: body.position.x,
                y: body.position.y + body.velocity.y * dt_sec,
            };
            if !body.collision_enabled || grid.passable(step_y.to_tile()) {
                body.position = step_y;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullAudio;

impl AudioPort for NullAudio {
    fn play_effect(&mut self, _id: &str) {}

    fn set_looping(&mut self, _id: &str, _looping: bool) {}
}

/// Test/diagnostic audio sink; the shared log survives moving the port into
/// the simulation.
#[derive(Clone, Debug, Default)]
pub struct RecordingAudio {
    log: Rc<RefCell<Vec<String>>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_handle(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.log)
    }
}

impl AudioPort for RecordingAudio {
    fn play_effect(&mut self, id: &str) {
        self.log.borrow_mut().push(id.to_string());
    }

    fn set_looping(&mut self, id: &str, looping: bool) {
        self.log
            .borrow_mut()
            .push(format!("loop:{id}:{looping}"));
    }
}

#[cfg(test)]
mod tests {
    use super::{BodyHandle, HeadlessPhysics, PhysicsPort};
    use crate::constants::TILE_SIZE;
    use crate::error::SimError;
    use crate::grid::SpatialGrid;
    use crate::types::Vec2f;

    fn open_grid(width: usize, height: usize) -> SpatialGrid {
        SpatialGrid::from_rows(&vec![vec![0u8; width]; height]).expect("grid builds")
    }

    #[test]
    fn integration_moves_bodies_by_velocity() {
        let mut physics = HeadlessPhysics::new();
        let grid = open_grid(10, 10);
        let body = physics.create_body(Vec2f { x: 24.0, y: 24.0 }, Vec2f { x: 12.0, y: 12.0 });
        physics.set_velocity(body, Vec2f { x: 32.0, y: 0.0 });
        physics.step(500, &grid);
        let position = physics.position(body);
        assert!((position.x - 40.0).abs() < 1e-3);
    }

    #[test]
    fn blocked_tiles_stop_colliding_bodies() {
        let mut rows = vec![vec![0u8; 4]; 4];
        rows[1][2] = 1;
        let grid = SpatialGrid::from_rows(&rows).expect("grid builds");
        let mut physics = HeadlessPhysics::new();
        let start = Vec2f {
            x: 1.5 * TILE_SIZE,
            y: 1.5 * TILE_SIZE,
        };
        let body = physics.create_body(start, Vec2f { x: 8.0, y: 8.0 });
        physics.set_velocity(body, Vec2f { x: 200.0, y: 0.0 });
        for _ in 0..4 {
            physics.step(50, &grid);
        }
        assert_eq!(physics.position(body).to_tile().x, 1);
    }

    #[test]
    fn double_destroy_is_a_teardown_error() {
        let mut physics = HeadlessPhysics::new();
        let body = physics.create_body(Vec2f::ZERO, Vec2f { x: 4.0, y: 4.0 });
        assert!(physics.destroy_body(body).is_ok());
        assert!(matches!(
            physics.destroy_body(body),
            Err(SimError::ResourceTeardown(_))
        ));
    }

    #[test]
    fn overlap_requires_both_axes_and_enabled_collision() {
        let mut physics = HeadlessPhysics::new();
        let size = Vec2f { x: 10.0, y: 10.0 };
        let a = physics.create_body(Vec2f { x: 0.0, y: 0.0 }, size);
        let b = physics.create_body(Vec2f { x: 8.0, y: 0.0 }, size);
        assert!(physics.overlaps(a, b));

        physics.set_position(b, Vec2f { x: 8.0, y: 30.0 });
        assert!(!physics.overlaps(a, b));

        physics.set_position(b, Vec2f { x: 8.0, y: 0.0 });
        physics.set_collision_enabled(b, false);
        assert!(!physics.overlaps(a, b));
    }

    #[test]
    fn destroyed_handles_report_origin_and_never_overlap() {
        let mut physics = HeadlessPhysics::new();
        let a = physics.create_body(Vec2f { x: 5.0, y: 5.0 }, Vec2f { x: 4.0, y: 4.0 });
        let b = physics.create_body(Vec2f { x: 5.0, y: 5.0 }, Vec2f { x: 4.0, y: 4.0 });
        physics.destroy_body(a).expect("first destroy succeeds");
        assert_eq!(physics.position(a), Vec2f::ZERO);
        assert!(!physics.overlaps(a, b));
        assert!(!physics.overlaps(BodyHandle(99), b));
    }
}
