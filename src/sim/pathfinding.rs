//! A* search over the terrain grid
//!
//! 4-directional moves with unit cost and a Manhattan heuristic, which is
//! admissible and consistent for that move set, so returned paths are
//! shortest paths. Ties are broken deterministically: lower f, then lower h,
//! then first pushed; neighbours are pushed in `Direction::ALL` order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::IVec2;

use super::geom::Direction;
use super::grid::Grid;

/// Open-set entry; owned by one search call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    cell: IVec2,
    g: u32,
    h: u32,
    seq: u32,
}

impl Node {
    fn f(&self) -> u32 {
        self.g + self.h
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse so the smallest key pops first
        other
            .f()
            .cmp(&self.f())
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn manhattan(a: IVec2, b: IVec2) -> u32 {
    ((a.x - b.x).unsigned_abs()) + ((a.y - b.y).unsigned_abs())
}

/// Shortest path from `start` to `goal`, both inclusive.
///
/// Returns an empty path when either endpoint is outside the grid or
/// impassable, or when the goal is unreachable.
pub fn find_path(grid: &Grid, start: IVec2, goal: IVec2) -> Vec<IVec2> {
    if !grid.is_passable(start) || !grid.is_passable(goal) {
        return Vec::new();
    }
    if start == goal {
        return vec![start];
    }

    let width = grid.width() as usize;
    let index = |c: IVec2| c.y as usize * width + c.x as usize;

    let cells = grid.cell_count();
    let mut g_score = vec![u32::MAX; cells];
    let mut came_from: Vec<Option<IVec2>> = vec![None; cells];
    let mut closed = vec![false; cells];

    let mut open = BinaryHeap::new();
    let mut seq = 0u32;
    g_score[index(start)] = 0;
    open.push(Node {
        cell: start,
        g: 0,
        h: manhattan(start, goal),
        seq,
    });

    // Every cell is closed at most once
    let mut expansions = 0usize;
    while let Some(current) = open.pop() {
        let ci = index(current.cell);
        if closed[ci] {
            continue;
        }
        closed[ci] = true;
        expansions += 1;
        if expansions > cells {
            log::error!(
                "A* exceeded {} expansions from {:?} to {:?}",
                cells,
                start,
                goal
            );
            return Vec::new();
        }

        if current.cell == goal {
            return reconstruct(&came_from, goal, &index);
        }

        for dir in Direction::ALL {
            let next = current.cell + dir.delta();
            if !grid.is_passable(next) {
                continue;
            }
            let ni = index(next);
            if closed[ni] {
                continue;
            }
            let tentative = current.g + 1;
            if tentative < g_score[ni] {
                g_score[ni] = tentative;
                came_from[ni] = Some(current.cell);
                seq += 1;
                open.push(Node {
                    cell: next,
                    g: tentative,
                    h: manhattan(next, goal),
                    seq,
                });
            }
        }
    }

    Vec::new()
}

fn reconstruct(
    came_from: &[Option<IVec2>],
    goal: IVec2,
    index: impl Fn(IVec2) -> usize,
) -> Vec<IVec2> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from[index(current)] {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    /// Brute-force BFS distance for comparison
    fn bfs_distance(grid: &Grid, start: IVec2, goal: IVec2) -> Option<usize> {
        if !grid.is_passable(start) || !grid.is_passable(goal) {
            return None;
        }
        let mut dist = vec![usize::MAX; grid.cell_count()];
        let idx = |c: IVec2| (c.y * grid.width() + c.x) as usize;
        let mut queue = VecDeque::new();
        dist[idx(start)] = 0;
        queue.push_back(start);
        while let Some(cell) = queue.pop_front() {
            if cell == goal {
                return Some(dist[idx(cell)]);
            }
            for dir in Direction::ALL {
                let next = cell + dir.delta();
                if grid.is_passable(next) && dist[idx(next)] == usize::MAX {
                    dist[idx(next)] = dist[idx(cell)] + 1;
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn assert_valid_path(grid: &Grid, path: &[IVec2], start: IVec2, goal: IVec2) {
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        for pair in path.windows(2) {
            assert_eq!(manhattan(pair[0], pair[1]), 1, "non-adjacent step {:?}", pair);
        }
        assert!(path.iter().all(|c| grid.is_passable(*c)));
    }

    #[test]
    fn test_straight_line() {
        let grid = Grid::new(5, 1);
        let path = find_path(&grid, IVec2::new(0, 0), IVec2::new(4, 0));
        assert_eq!(path.len(), 5);
        assert_valid_path(&grid, &path, IVec2::new(0, 0), IVec2::new(4, 0));
    }

    #[test]
    fn test_routes_around_wall() {
        let grid = Grid::from_rows(&[
            ".....",
            ".###.",
            ".....",
        ]);
        let start = IVec2::new(2, 0);
        let goal = IVec2::new(2, 2);
        let path = find_path(&grid, start, goal);
        assert_valid_path(&grid, &path, start, goal);
        assert_eq!(path.len() - 1, 6);
    }

    #[test]
    fn test_unreachable_returns_empty() {
        let grid = Grid::from_rows(&[
            "..@..",
            "..@..",
            "..@..",
        ]);
        let path = find_path(&grid, IVec2::new(0, 0), IVec2::new(4, 2));
        assert!(path.is_empty());
    }

    #[test]
    fn test_out_of_bounds_endpoints() {
        let grid = Grid::new(3, 3);
        assert!(find_path(&grid, IVec2::new(-1, 0), IVec2::new(2, 2)).is_empty());
        assert!(find_path(&grid, IVec2::new(0, 0), IVec2::new(3, 0)).is_empty());
    }

    #[test]
    fn test_start_equals_goal() {
        let grid = Grid::new(2, 2);
        assert_eq!(find_path(&grid, IVec2::ONE, IVec2::ONE), vec![IVec2::ONE]);
    }

    #[test]
    fn test_deterministic_tie_breaking() {
        let grid = Grid::new(6, 6);
        let a = find_path(&grid, IVec2::ZERO, IVec2::new(5, 5));
        let b = find_path(&grid, IVec2::ZERO, IVec2::new(5, 5));
        assert_eq!(a, b);
        assert_eq!(a.len(), 11);
    }

    fn grid_strategy() -> impl Strategy<Value = (Grid, IVec2, IVec2)> {
        (2i32..8, 2i32..8).prop_flat_map(|(w, h)| {
            (
                prop::collection::vec(prop::bool::weighted(0.3), (w * h) as usize),
                0..w,
                0..h,
                0..w,
                0..h,
            )
                .prop_map(move |(walls, sx, sy, gx, gy)| {
                    let mut grid = Grid::new(w, h);
                    for (i, wall) in walls.into_iter().enumerate() {
                        if wall {
                            let cell = IVec2::new(i as i32 % w, i as i32 / w);
                            grid = grid.with_tile(cell, crate::sim::grid::Tile::Steel);
                        }
                    }
                    (grid, IVec2::new(sx, sy), IVec2::new(gx, gy))
                })
        })
    }

    proptest! {
        #[test]
        fn prop_matches_bfs_shortest_path((grid, start, goal) in grid_strategy()) {
            let path = find_path(&grid, start, goal);
            match bfs_distance(&grid, start, goal) {
                Some(dist) => {
                    prop_assert_eq!(path.len(), dist + 1);
                    assert_valid_path(&grid, &path, start, goal);
                }
                None => prop_assert!(path.is_empty()),
            }
        }
    }
}
