use tracing::{debug, warn};

use crate::error::SimError;
use crate::grid::SpatialGrid;
use crate::types::{DoorSpec, LevelData, LightSettings, TileLayer, Vec2, WorldData};

/// One playfield: its passability grid, graphic layers, doors and lighting.
#[derive(Clone, Debug)]
pub struct WorldSide {
    pub grid: SpatialGrid,
    pub background_layers: Vec<TileLayer>,
    pub foreground_layers: Vec<TileLayer>,
    pub doors: Vec<DoorSpec>,
    pub light: LightSettings,
    pub theme_id: String,
}

/// The two parallel playfields of a level. Exactly one side is active at any
/// instant; all passability, door and visibility queries go through it.
#[derive(Clone, Debug)]
pub struct WorldMap {
    real: WorldSide,
    ghost: Option<WorldSide>,
    ghost_active: bool,
    width: i32,
    height: i32,
}

impl WorldMap {
    pub fn build(level: &LevelData) -> Result<Self, SimError> {
        let real = build_side(&level.real_world, level.width, level.height)?;
        let ghost = match &level.ghost_world {
            Some(data) => Some(build_side(data, level.width, level.height)?),
            None => None,
        };
        Ok(Self {
            real,
            ghost,
            ghost_active: false,
            width: level.width,
            height: level.height,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_ghost_active(&self) -> bool {
        self.ghost_active
    }

    pub fn has_ghost_side(&self) -> bool {
        self.ghost.is_some()
    }

    /// Flips which side is queried and rendered. Returns whether the flag
    /// changed; asking for the ghost side on a level without one is refused.
    pub fn toggle_active_world(&mut self, ghost: bool) -> bool {
        if ghost && self.ghost.is_none() {
            warn!("level has no ghost world; ignoring toggle");
            return false;
        }
        if self.ghost_active == ghost {
            return false;
        }
        self.ghost_active = ghost;
        debug!(ghost, "active world toggled");
        true
    }

    pub fn active(&self) -> &WorldSide {
        if self.ghost_active {
            if let Some(side) = &self.ghost {
                return side;
            }
        }
        &self.real
    }

    pub fn active_grid(&self) -> &SpatialGrid {
        &self.active().grid
    }

    pub fn passable(&self, tile: Vec2) -> bool {
        self.active_grid().passable(tile)
    }

    /// Exact-tile door lookup on the active side. Door lists are small, the
    /// linear scan is fine.
    pub fn door_at(&self, tile: Vec2) -> Option<&DoorSpec> {
        self.active()
            .doors
            .iter()
            .find(|door| door.from_position == tile)
    }
}

fn build_side(data: &WorldData, width: i32, height: i32) -> Result<WorldSide, SimError> {
    let grid = SpatialGrid::from_rows(&data.collision)?;
    if grid.width() != width || grid.height() != height {
        return Err(SimError::Configuration(format!(
            "collision grid is {}x{}, level declares {}x{}",
            grid.width(),
            grid.height(),
            width,
            height
        )));
    }
    for door in &data.doors {
        if !grid.in_bounds(door.from_position) {
            return Err(SimError::Configuration(format!(
                "door to `{}` sits outside the grid at ({},{})",
                door.to_level_id, door.from_position.x, door.from_position.y
            )));
        }
    }
    Ok(WorldSide {
        grid,
        background_layers: data.background_layers.clone(),
        foreground_layers: data.foreground_layers.clone(),
        doors: data.doors.clone(),
        light: data.light.unwrap_or_default(),
        theme_id: data.theme_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::WorldMap;
    use crate::error::SimError;
    use crate::types::{DoorSpec, LevelData, Vec2, WorldData};

    fn world_data(width: usize, height: usize) -> WorldData {
        WorldData {
            collision: vec![vec![0u8; width]; height],
            background_layers: Vec::new(),
            foreground_layers: Vec::new(),
            doors: Vec::new(),
            actors: Vec::new(),
            light: None,
            theme_id: "stone".to_string(),
        }
    }

    fn level(width: i32, height: i32, with_ghost: bool) -> LevelData {
        LevelData {
            id: "test_level".to_string(),
            width,
            height,
            real_world: world_data(width as usize, height as usize),
            ghost_world: with_ghost.then(|| world_data(width as usize, height as usize)),
            start_position: Vec2 { x: 1, y: 1 },
            dialogs: Vec::new(),
        }
    }

    #[test]
    fn dimension_mismatch_fails_construction() {
        let mut data = level(5, 5, false);
        data.real_world.collision.pop();
        let result = WorldMap::build(&data);
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn toggle_switches_active_side_queries() {
        let mut data = level(5, 5, true);
        data.real_world.collision[2][2] = 1;
        let mut world = WorldMap::build(&data).expect("world builds");

        let tile = Vec2 { x: 2, y: 2 };
        assert!(!world.passable(tile));
        assert!(world.toggle_active_world(true));
        assert!(world.passable(tile));
        assert!(world.toggle_active_world(false));
        assert!(!world.passable(tile));
    }

    #[test]
    fn ghost_toggle_without_ghost_side_is_refused() {
        let mut world = WorldMap::build(&level(4, 4, false)).expect("world builds");
        assert!(!world.toggle_active_world(true));
        assert!(!world.is_ghost_active());
    }

    #[test]
    fn toggle_to_same_side_reports_unchanged() {
        let mut world = WorldMap::build(&level(4, 4, true)).expect("world builds");
        assert!(!world.toggle_active_world(false));
        assert!(world.toggle_active_world(true));
        assert!(!world.toggle_active_world(true));
    }

    #[test]
    fn door_lookup_matches_exact_tile_on_active_side_only() {
        let mut data = level(6, 6, true);
        data.real_world.doors.push(DoorSpec {
            from_position: Vec2 { x: 3, y: 4 },
            to_position: Vec2 { x: 1, y: 1 },
            to_level_id: "crypt".to_string(),
        });
        let mut world = WorldMap::build(&data).expect("world builds");

        assert!(world.door_at(Vec2 { x: 3, y: 4 }).is_some());
        assert!(world.door_at(Vec2 { x: 4, y: 3 }).is_none());
        world.toggle_active_world(true);
        assert!(world.door_at(Vec2 { x: 3, y: 4 }).is_none());
    }

    #[test]
    fn out_of_bounds_door_fails_construction() {
        let mut data = level(4, 4, false);
        data.real_world.doors.push(DoorSpec {
            from_position: Vec2 { x: 9, y: 9 },
            to_position: Vec2 { x: 0, y: 0 },
            to_level_id: "nowhere".to_string(),
        });
        assert!(matches!(
            WorldMap::build(&data),
            Err(SimError::Configuration(_))
        ));
    }
}
