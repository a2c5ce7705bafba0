// generator.rs - Randomized depth-first carving with backtracking
//
// Carving runs on an explicit stack of frames instead of the call stack, so
// large grids cannot exhaust it. Visitation order and per-step shuffling are
// the same as the recursive formulation.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::grid::{validate_dimensions, Coord, Grid};

/// Lattice steps two cells away, in the order they are offered to the shuffle.
const DIRECTIONS: [(isize, isize); 4] = [(0, -2), (2, 0), (0, 2), (-2, 0)];

/// One pending cell: its shuffled candidates and how many have been tried.
struct Frame {
    cell: Coord,
    directions: [(isize, isize); 4],
    next: usize,
}

impl Frame {
    fn new<R: Rng + ?Sized>(cell: Coord, rng: &mut R) -> Self {
        let mut directions = DIRECTIONS;
        directions.shuffle(rng);
        Self {
            cell,
            directions,
            next: 0,
        }
    }
}

/// Generate a perfect maze of `width` x `height` cells.
///
/// Both dimensions must be odd and at least 3. Cell (1,1) is always open and
/// the open cells form a spanning tree over the odd-odd lattice.
pub fn generate<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> Result<Grid> {
    validate_dimensions(width, height)?;

    let mut grid = Grid::filled(width, height);
    let origin = Coord::new(1, 1);
    grid.open(origin);

    let mut stack = vec![Frame::new(origin, rng)];
    let mut carved = 1usize;

    while let Some(frame) = stack.last_mut() {
        let Some(&(dx, dy)) = frame.directions.get(frame.next) else {
            // All four candidates exhausted: backtrack
            stack.pop();
            continue;
        };
        frame.next += 1;
        let cell = frame.cell;

        let Some(target) = cell.offset(dx, dy) else {
            continue;
        };
        if !within_margins(target, width, height) || grid.is_open(target) {
            continue;
        }

        // Both offsets are even, so the midpoint is exact and in bounds
        let Some(between) = cell.offset(dx / 2, dy / 2) else {
            continue;
        };
        grid.open(between);
        grid.open(target);
        carved += 1;

        stack.push(Frame::new(target, rng));
    }

    log::debug!("Carved {width}x{height} maze with {carved} lattice cells");
    Ok(grid)
}

/// Deterministic generation from a 64-bit seed.
pub fn generate_seeded(width: usize, height: usize, seed: u64) -> Result<Grid> {
    let mut rng = StdRng::seed_from_u64(seed);
    generate(width, height, &mut rng)
}

#[inline]
fn within_margins(c: Coord, width: usize, height: usize) -> bool {
    (1..=width - 2).contains(&c.x) && (1..=height - 2).contains(&c.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MazeError;
    use crate::grid::Cell;

    #[test]
    fn test_rejects_bad_dimensions() {
        let mut rng = StdRng::seed_from_u64(7);
        for (w, h) in [(4, 5), (5, 4), (1, 1), (2, 3), (0, 0)] {
            assert_eq!(
                generate(w, h, &mut rng),
                Err(MazeError::InvalidDimension { width: w, height: h })
            );
        }
    }

    #[test]
    fn test_smallest_maze_is_single_cell() {
        let grid = generate_seeded(3, 3, 1).unwrap();
        assert_eq!(grid.open_count(), 1);
        assert!(grid.is_open(Coord::new(1, 1)));
        assert!(grid.is_spanning_tree());
    }

    #[test]
    fn test_five_by_five_scenario() {
        let grid = generate_seeded(5, 5, 42).unwrap();

        for (x, y) in [(1, 1), (1, 3), (3, 1), (3, 3)] {
            assert!(grid.is_open(Coord::new(x, y)), "({x},{y}) should be open");
        }
        for i in 0..5 {
            for border in [
                Coord::new(0, i),
                Coord::new(4, i),
                Coord::new(i, 0),
                Coord::new(i, 4),
            ] {
                assert_eq!(grid.get(border), Some(Cell::Wall), "{border} should be wall");
            }
        }
        // 4 lattice cells joined by 3 connectors
        assert_eq!(grid.open_count(), 7);
        assert!(grid.is_spanning_tree());
    }

    #[test]
    fn test_every_odd_lattice_cell_is_carved() {
        let grid = generate_seeded(51, 31, 2024).unwrap();
        for y in (1..31).step_by(2) {
            for x in (1..51).step_by(2) {
                assert!(grid.is_open(Coord::new(x, y)));
            }
        }
        // Even-even lattice offsets stay walls
        for y in (0..31).step_by(2) {
            for x in (0..51).step_by(2) {
                assert!(!grid.is_open(Coord::new(x, y)));
            }
        }
        assert!(grid.is_spanning_tree());
    }

    #[test]
    fn test_same_seed_same_maze() {
        let a = generate_seeded(21, 15, 99).unwrap();
        let b = generate_seeded(21, 15, 99).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_large_grid_does_not_overflow_stack() {
        let grid = generate_seeded(401, 401, 3).unwrap();
        assert_eq!(grid.open_count(), 200 * 200 + (200 * 200 - 1));
    }
}
