use crate::error::SimError;
use crate::grid::SpatialGrid;
use crate::types::Vec2;

#[derive(Clone, Copy, Debug)]
struct OpenNode {
    tile: Vec2,
    h_cost: i32,
    f_cost: i32,
    insertion: u64,
}

/// A* over the grid with 4-directional movement (diagonals and therefore
/// corner-cutting are impossible). Returns the tile path including the start
/// tile. Tie-breaks are fully deterministic: (f, h, y, x, insertion order).
pub fn find_path(grid: &SpatialGrid, start: Vec2, goal: Vec2) -> Result<Vec<Vec2>, SimError> {
    if !grid.passable(start) || !grid.passable(goal) {
        return Err(SimError::Pathfinding { from: start, to: goal });
    }
    if start == goal {
        return Ok(vec![start]);
    }

    let width = grid.width();
    let node_count = (width * grid.height()) as usize;
    let index_of = |tile: Vec2| (tile.y * width + tile.x) as usize;

    let mut closed = vec![false; node_count];
    let mut best_g = vec![i32::MAX; node_count];
    let mut parent = vec![None::<usize>; node_count];
    let mut open: Vec<OpenNode> = Vec::new();
    let mut next_insertion = 0u64;

    let start_h = manhattan(start, goal);
    open.push(OpenNode {
        tile: start,
        h_cost: start_h,
        f_cost: start_h,
        insertion: next_insertion,
    });
    next_insertion += 1;
    best_g[index_of(start)] = 0;

    while !open.is_empty() {
        let best = pick_best(&open);
        let current = open.swap_remove(best);
        let current_index = index_of(current.tile);
        if closed[current_index] {
            continue;
        }
        closed[current_index] = true;

        if current.tile == goal {
            return Ok(reconstruct(&parent, width, index_of(start), current_index));
        }

        let current_g = best_g[current_index];
        for neighbor in neighbors(current.tile) {
            if !grid.passable(neighbor) {
                continue;
            }
            let neighbor_index = index_of(neighbor);
            if closed[neighbor_index] {
                continue;
            }
            let tentative_g = current_g + 1;
            if tentative_g >= best_g[neighbor_index] {
                continue;
            }
            best_g[neighbor_index] = tentative_g;
            parent[neighbor_index] = Some(current_index);
            let h_cost = manhattan(neighbor, goal);
            open.push(OpenNode {
                tile: neighbor,
                h_cost,
                f_cost: tentative_g + h_cost,
                insertion: next_insertion,
            });
            next_insertion += 1;
        }
    }

    Err(SimError::Pathfinding { from: start, to: goal })
}

fn manhattan(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

fn neighbors(tile: Vec2) -> [Vec2; 4] {
    [
        Vec2 { x: tile.x, y: tile.y - 1 },
        Vec2 { x: tile.x + 1, y: tile.y },
        Vec2 { x: tile.x, y: tile.y + 1 },
        Vec2 { x: tile.x - 1, y: tile.y },
    ]
}

fn pick_best(open: &[OpenNode]) -> usize {
    let mut best = 0usize;
    for index in 1..open.len() {
        if order_key(open[index]) < order_key(open[best]) {
            best = index;
        }
    }
    best
}

fn order_key(node: OpenNode) -> (i32, i32, i32, i32, u64) {
    (node.f_cost, node.h_cost, node.tile.y, node.tile.x, node.insertion)
}

fn reconstruct(parent: &[Option<usize>], width: i32, start_index: usize, goal_index: usize) -> Vec<Vec2> {
    let mut indices = vec![goal_index];
    let mut cursor = goal_index;
    while cursor != start_index {
        match parent[cursor] {
            Some(previous) => cursor = previous,
            None => break,
        }
        indices.push(cursor);
    }
    indices.reverse();
    indices
        .into_iter()
        .map(|index| Vec2 {
            x: index as i32 % width,
            y: index as i32 / width,
        })
        .collect()
}
