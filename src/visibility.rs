use crate::constants::ALPHA_RATE_FLOOR;
use crate::grid::SpatialGrid;
use crate::types::{LightSettings, TileRect, Vec2};

/// Precomputed fog alphas indexed by `radius - distance` in whole tile
/// steps: index 0 sits at the light's edge, the last index at the player.
/// Values decrease monotonically, so tiles get more lit toward the player.
#[derive(Clone, Debug)]
pub struct RolloffTable {
    steps: Vec<f32>,
}

impl RolloffTable {
    pub fn build(settings: &LightSettings) -> Self {
        let count = settings.player_light_radius.ceil().max(0.0) as usize + 1;
        let steps = (0..count)
            .map(|index| {
                let lit = (index as f32 + 1.0) / count as f32;
                (settings.ambient_alpha * (1.0 - lit)).max(0.0)
            })
            .collect();
        Self { steps }
    }

    pub fn target_alpha(&self, settings: &LightSettings, distance: f32) -> f32 {
        if distance >= settings.player_light_radius {
            return settings.ambient_alpha;
        }
        let index = (settings.player_light_radius - distance).floor() as usize;
        self.steps[index.min(self.steps.len() - 1)]
    }

    /// The most-lit value, reached at the player's own tile.
    pub fn min_alpha(&self) -> f32 {
        self.steps.last().copied().unwrap_or(0.0)
    }
}

/// Per-tile fog alpha around the player. A pure function of the player tile,
/// the frame delta and the static settings; the only state is the last
/// rendered alpha per tile, which eases toward its target every frame.
#[derive(Clone, Debug)]
pub struct VisibilityField {
    width: i32,
    height: i32,
    settings: LightSettings,
    table: RolloffTable,
    alphas: Vec<f32>,
}

impl VisibilityField {
    pub fn new(grid: &SpatialGrid, settings: LightSettings) -> Self {
        let table = RolloffTable::build(&settings);
        let alphas = vec![settings.ambient_alpha; (grid.width() * grid.height()) as usize];
        Self {
            width: grid.width(),
            height: grid.height(),
            settings,
            table,
            alphas,
        }
    }

    pub fn settings(&self) -> &LightSettings {
        &self.settings
    }

    pub fn min_alpha(&self) -> f32 {
        self.table.min_alpha()
    }

    /// Eases every tile inside `camera` toward its target alpha. The easing
    /// rate scales with the remaining difference but never drops under
    /// [`ALPHA_RATE_FLOOR`], so targets are reached instead of approached
    /// forever.
    pub fn update(&mut self, player_tile: Vec2, camera: TileRect, dt_ms: u64) {
        let min_y = camera.min.y.max(0);
        let max_y = camera.max.y.min(self.height - 1);
        let min_x = camera.min.x.max(0);
        let max_x = camera.max.x.min(self.width - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let dx = (x - player_tile.x) as f32;
                let dy = (y - player_tile.y) as f32;
                let distance = (dx * dx + dy * dy).sqrt();
                let target = self.table.target_alpha(&self.settings, distance);

                let index = (y * self.width + x) as usize;
                let current = self.alphas[index];
                let difference = target - current;
                if difference == 0.0 {
                    continue;
                }
                let rate = difference.abs().max(ALPHA_RATE_FLOOR);
                let step = self.settings.alpha_per_ms * dt_ms as f32 * rate;
                self.alphas[index] = if difference.abs() <= step {
                    target
                } else if difference > 0.0 {
                    current + step
                } else {
                    current - step
                };
            }
        }
    }

    /// Out-of-bounds tiles read as full ambient fog.
    pub fn alpha_at(&self, tile: Vec2) -> f32 {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width || tile.y >= self.height {
            return self.settings.ambient_alpha;
        }
        self.alphas[(tile.y * self.width + tile.x) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::{RolloffTable, VisibilityField};
    use crate::grid::SpatialGrid;
    use crate::types::{LightSettings, TileRect, Vec2};

    fn open_grid(width: usize, height: usize) -> SpatialGrid {
        SpatialGrid::from_rows(&vec![vec![0u8; width]; height]).expect("grid builds")
    }

    fn settings() -> LightSettings {
        LightSettings {
            player_light_radius: 4.0,
            ambient_alpha: 0.8,
            alpha_per_ms: 0.01,
        }
    }

    fn full_camera(width: i32, height: i32) -> TileRect {
        TileRect {
            min: Vec2 { x: 0, y: 0 },
            max: Vec2 {
                x: width - 1,
                y: height - 1,
            },
        }
    }

    #[test]
    fn rolloff_is_monotonically_more_lit_toward_the_player() {
        let table = RolloffTable::build(&settings());
        let s = settings();
        let mut previous = f32::MAX;
        for distance in [3.9f32, 3.0, 2.0, 1.0, 0.0] {
            let alpha = table.target_alpha(&s, distance);
            assert!(alpha <= previous, "alpha must not increase toward player");
            previous = alpha;
        }
        assert_eq!(table.target_alpha(&s, 4.0), s.ambient_alpha);
        assert_eq!(table.target_alpha(&s, 9.0), s.ambient_alpha);
    }

    #[test]
    fn player_tile_converges_to_minimum_rolloff_value() {
        let grid = open_grid(12, 12);
        let mut field = VisibilityField::new(&grid, settings());
        let player = Vec2 { x: 6, y: 6 };
        let camera = full_camera(12, 12);

        for _ in 0..400 {
            field.update(player, camera, 50);
        }
        let alpha = field.alpha_at(player);
        assert!(
            (alpha - field.min_alpha()).abs() < 1e-4,
            "player tile alpha {alpha} did not converge to {}",
            field.min_alpha()
        );
    }

    #[test]
    fn tile_beyond_radius_converges_to_ambient_from_any_start() {
        let grid = open_grid(12, 12);
        let mut field = VisibilityField::new(&grid, settings());
        let player = Vec2 { x: 2, y: 2 };
        let camera = full_camera(12, 12);
        let far = Vec2 { x: 7, y: 2 };

        // Start from a fully lit value, not the ambient default.
        let index = (far.y * 12 + far.x) as usize;
        field.alphas[index] = 0.0;

        for _ in 0..400 {
            field.update(player, camera, 50);
        }
        let alpha = field.alpha_at(far);
        assert!(
            (alpha - field.settings.ambient_alpha).abs() < 1e-4,
            "far tile alpha {alpha} did not converge to ambient"
        );
    }

    #[test]
    fn tiles_outside_camera_are_left_untouched() {
        let grid = open_grid(16, 16);
        let mut field = VisibilityField::new(&grid, settings());
        let player = Vec2 { x: 2, y: 2 };
        let camera = TileRect {
            min: Vec2 { x: 0, y: 0 },
            max: Vec2 { x: 7, y: 7 },
        };

        field.update(player, camera, 50);
        assert_eq!(
            field.alpha_at(Vec2 { x: 15, y: 15 }),
            field.settings.ambient_alpha
        );
    }

    #[test]
    fn out_of_bounds_alpha_reads_as_ambient() {
        let grid = open_grid(4, 4);
        let field = VisibilityField::new(&grid, settings());
        assert_eq!(field.alpha_at(Vec2 { x: -1, y: 0 }), 0.8);
        assert_eq!(field.alpha_at(Vec2 { x: 4, y: 4 }), 0.8);
    }
}
