use crate::error::SimError;
use crate::types::Vec2;

/// Per-world passability map, row-major `[y][x]`. Out-of-bounds queries
/// report blocked so pathfinding and visibility stay well-behaved at edges.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    width: i32,
    height: i32,
    cells: Vec<bool>,
}

impl SpatialGrid {
    /// Builds a grid from the level document's 0/1 collision rows
    /// (0 = passable, nonzero = blocked).
    pub fn from_rows(rows: &[Vec<u8>]) -> Result<Self, SimError> {
        if rows.is_empty() {
            return Err(SimError::Configuration(
                "collision grid has no rows".to_string(),
            ));
        }
        let width = rows[0].len();
        if width == 0 {
            return Err(SimError::Configuration(
                "collision grid has empty rows".to_string(),
            ));
        }
        for (y, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(SimError::Configuration(format!(
                    "collision row {y} has width {}, expected {width}",
                    row.len()
                )));
            }
        }
        let cells = rows
            .iter()
            .flat_map(|row| row.iter().map(|cell| *cell == 0))
            .collect();
        Ok(Self {
            width: width as i32,
            height: rows.len() as i32,
            cells,
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, tile: Vec2) -> bool {
        tile.x >= 0 && tile.y >= 0 && tile.x < self.width && tile.y < self.height
    }

    pub fn passable(&self, tile: Vec2) -> bool {
        if !self.in_bounds(tile) {
            return false;
        }
        self.cells[(tile.y * self.width + tile.x) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::SpatialGrid;
    use crate::error::SimError;
    use crate::types::Vec2;

    fn open_rows(width: usize, height: usize) -> Vec<Vec<u8>> {
        vec![vec![0u8; width]; height]
    }

    #[test]
    fn out_of_bounds_reports_blocked() {
        let grid = SpatialGrid::from_rows(&open_rows(4, 3)).expect("grid builds");
        assert!(grid.passable(Vec2 { x: 0, y: 0 }));
        assert!(grid.passable(Vec2 { x: 3, y: 2 }));
        assert!(!grid.passable(Vec2 { x: -1, y: 0 }));
        assert!(!grid.passable(Vec2 { x: 4, y: 0 }));
        assert!(!grid.passable(Vec2 { x: 0, y: 3 }));
    }

    #[test]
    fn nonzero_cells_are_blocked() {
        let mut rows = open_rows(3, 3);
        rows[1][2] = 1;
        let grid = SpatialGrid::from_rows(&rows).expect("grid builds");
        assert!(!grid.passable(Vec2 { x: 2, y: 1 }));
        assert!(grid.passable(Vec2 { x: 1, y: 1 }));
    }

    #[test]
    fn ragged_rows_fail_construction() {
        let mut rows = open_rows(3, 3);
        rows[2].push(0);
        let result = SpatialGrid::from_rows(&rows);
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn empty_grid_fails_construction() {
        assert!(matches!(
            SpatialGrid::from_rows(&[]),
            Err(SimError::Configuration(_))
        ));
    }
}
