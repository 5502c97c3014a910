use crate::types::{TileRect, Vec2f};

/// Path replanning is rate-limited to `update_cooldown / speed` ms: faster
/// actors replan more often.
pub(super) fn path_recompute_interval_ms(update_cooldown: f32, speed: f32) -> u64 {
    if speed <= f32::EPSILON {
        return 60_000;
    }
    (update_cooldown / speed).max(0.0) as u64
}

/// Animation key from the dominant velocity axis.
pub(super) fn facing_animation(velocity: Vec2f) -> &'static str {
    if velocity.x == 0.0 && velocity.y == 0.0 {
        return "idle";
    }
    if velocity.x.abs() >= velocity.y.abs() {
        if velocity.x >= 0.0 {
            "walk_right"
        } else {
            "walk_left"
        }
    } else if velocity.y >= 0.0 {
        "walk_down"
    } else {
        "walk_up"
    }
}

/// Tile footprint of a body given its center and size in world units. The
/// far edge is nudged inward so a body flush with a tile boundary does not
/// claim the next tile over.
pub(super) fn footprint(center: Vec2f, size: Vec2f) -> TileRect {
    let half = size.scaled(0.5);
    let edge = Vec2f { x: 0.01, y: 0.01 };
    TileRect {
        min: (center - half).to_tile(),
        max: (center + half - edge).to_tile(),
    }
}

#[cfg(test)]
mod tests {
    use super::{facing_animation, footprint, path_recompute_interval_ms};
    use crate::constants::TILE_SIZE;
    use crate::types::{Vec2, Vec2f};

    #[test]
    fn facing_prefers_dominant_axis() {
        assert_eq!(facing_animation(Vec2f { x: 3.0, y: 1.0 }), "walk_right");
        assert_eq!(facing_animation(Vec2f { x: -3.0, y: 1.0 }), "walk_left");
        assert_eq!(facing_animation(Vec2f { x: 1.0, y: 4.0 }), "walk_down");
        assert_eq!(facing_animation(Vec2f { x: 1.0, y: -4.0 }), "walk_up");
        assert_eq!(facing_animation(Vec2f::ZERO), "idle");
    }

    #[test]
    fn footprint_spans_the_covered_tiles() {
        let center = Vec2 { x: 2, y: 3 }.center_world();
        let rect = footprint(center, Vec2f { x: TILE_SIZE, y: TILE_SIZE });
        assert_eq!(rect.min, Vec2 { x: 2, y: 3 });
        assert_eq!(rect.max, Vec2 { x: 2, y: 3 });

        let wide = footprint(center, Vec2f { x: TILE_SIZE * 3.0, y: TILE_SIZE });
        assert_eq!(wide.min, Vec2 { x: 1, y: 3 });
        assert_eq!(wide.max, Vec2 { x: 3, y: 3 });
    }

    #[test]
    fn recompute_interval_divides_cooldown_by_speed() {
        assert_eq!(path_recompute_interval_ms(30_000.0, 100.0), 300);
        assert_eq!(path_recompute_interval_ms(30_000.0, 0.0), 60_000);
    }
}
