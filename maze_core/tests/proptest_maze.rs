//! Property tests for maze generation and path solving.
//!
//! Mazes are generated from proptest-chosen seeds so every failure is
//! reproducible from the shrunk input.

use std::collections::VecDeque;

use maze_core::{generate_seeded, shortest_path, Coord, Grid, MazeError};
use proptest::prelude::*;

/// Odd dimensions in 3..=31.
fn odd_dim() -> impl Strategy<Value = usize> {
    (1usize..=15).prop_map(|n| 2 * n + 1)
}

/// Distance between two cells by walking the unique tree route with a DFS.
/// Independent of the solver's BFS so the two can be compared.
fn tree_distance(grid: &Grid, a: Coord, b: Coord) -> Option<usize> {
    let mut stack = vec![(a, None::<Coord>, 1usize)];
    while let Some((cell, from, depth)) = stack.pop() {
        if cell == b {
            return Some(depth);
        }
        for next in grid.neighbors4(cell) {
            if Some(next) != from && grid.is_open(next) {
                stack.push((next, Some(cell), depth + 1));
            }
        }
    }
    None
}

fn reachable_from_origin(grid: &Grid) -> usize {
    let mut seen = std::collections::HashSet::new();
    let mut queue = VecDeque::from([Coord::new(1, 1)]);
    seen.insert(Coord::new(1, 1));
    while let Some(cell) = queue.pop_front() {
        for next in grid.neighbors4(cell) {
            if grid.is_open(next) && seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    seen.len()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn generated_mazes_are_spanning_trees(w in odd_dim(), h in odd_dim(), seed in any::<u64>()) {
        let grid = generate_seeded(w, h, seed).unwrap();

        prop_assert!(grid.is_open(Coord::new(1, 1)));
        prop_assert_eq!(reachable_from_origin(&grid), grid.open_count());
        prop_assert_eq!(grid.open_count() - 1, grid.open_edge_count());

        // Border is solid
        for x in 0..w {
            prop_assert!(!grid.is_open(Coord::new(x, 0)));
            prop_assert!(!grid.is_open(Coord::new(x, h - 1)));
        }
        for y in 0..h {
            prop_assert!(!grid.is_open(Coord::new(0, y)));
            prop_assert!(!grid.is_open(Coord::new(w - 1, y)));
        }
    }

    #[test]
    fn paths_match_tree_distance(
        w in odd_dim(),
        h in odd_dim(),
        seed in any::<u64>(),
        picks in (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
    ) {
        let grid = generate_seeded(w, h, seed).unwrap();
        let open: Vec<Coord> = grid.open_cells().collect();
        let a = open[picks.0.index(open.len())];
        let b = open[picks.1.index(open.len())];

        let path = shortest_path(&grid, a, b);
        prop_assert_eq!(path.first(), Some(a));
        prop_assert_eq!(path.last(), Some(b));
        prop_assert!(path.is_contiguous());
        prop_assert!(path.iter().all(|c| grid.is_open(c)));

        // Simple: no cell repeats
        let mut cells: Vec<Coord> = path.iter().collect();
        cells.sort();
        cells.dedup();
        prop_assert_eq!(cells.len(), path.len());

        prop_assert_eq!(Some(path.len()), tree_distance(&grid, a, b));
    }

    #[test]
    fn self_path_is_single_cell(w in odd_dim(), h in odd_dim(), seed in any::<u64>(), pick in any::<prop::sample::Index>()) {
        let grid = generate_seeded(w, h, seed).unwrap();
        let open: Vec<Coord> = grid.open_cells().collect();
        let a = open[pick.index(open.len())];
        let path = shortest_path(&grid, a, a);
        prop_assert_eq!(path.as_slice(), &[a]);
    }

    #[test]
    fn wall_endpoints_give_empty_path(w in odd_dim(), h in odd_dim(), seed in any::<u64>(), pick in any::<prop::sample::Index>()) {
        let grid = generate_seeded(w, h, seed).unwrap();
        let walls: Vec<Coord> = grid.wall_cells().collect();
        let wall = walls[pick.index(walls.len())];
        prop_assert!(shortest_path(&grid, wall, Coord::new(1, 1)).is_empty());
        prop_assert!(shortest_path(&grid, Coord::new(1, 1), wall).is_empty());
    }

    #[test]
    fn seeded_generation_is_reproducible(w in odd_dim(), h in odd_dim(), seed in any::<u64>()) {
        prop_assert_eq!(generate_seeded(w, h, seed).unwrap(), generate_seeded(w, h, seed).unwrap());
    }

    #[test]
    fn invalid_dimensions_are_rejected(w in 0usize..40, h in 0usize..40, seed in any::<u64>()) {
        let valid = |d: usize| d >= 3 && d % 2 == 1;
        prop_assume!(!(valid(w) && valid(h)));
        prop_assert_eq!(
            generate_seeded(w, h, seed),
            Err(MazeError::InvalidDimension { width: w, height: h })
        );
    }
}

#[test]
fn different_seeds_give_different_mazes() {
    let a = generate_seeded(51, 31, 1).unwrap();
    let b = generate_seeded(51, 31, 2).unwrap();
    assert_ne!(a, b);
}
