// solver.rs - Breadth-first shortest path over the open-cell subgraph

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::grid::{Coord, Grid};

/// Ordered, 4-adjacent sequence of open cells from a start to an end.
///
/// Empty when no route exists; callers treat that as "nothing to animate".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<Coord>);

impl Path {
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Coord] {
        &self.0
    }

    #[inline]
    pub fn first(&self) -> Option<Coord> {
        self.0.first().copied()
    }

    #[inline]
    pub fn last(&self) -> Option<Coord> {
        self.0.last().copied()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Coord> + '_ {
        self.0.iter().copied()
    }

    /// Every consecutive pair is 4-adjacent.
    pub fn is_contiguous(&self) -> bool {
        self.0.windows(2).all(|w| w[0].is_adjacent(w[1]))
    }
}

impl From<Vec<Coord>> for Path {
    fn from(cells: Vec<Coord>) -> Self {
        Path(cells)
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Coord;
    type IntoIter = std::slice::Iter<'a, Coord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Shortest open-cell path from `start` to `end`.
///
/// WALL or out-of-bounds endpoints give the empty path. Neighbours are expanded
/// in the order +x, -x, +y, -y and the search stops as soon as `end` is
/// dequeued.
pub fn shortest_path(grid: &Grid, start: Coord, end: Coord) -> Path {
    if !grid.is_open(start) || !grid.is_open(end) {
        log::debug!("No path: endpoint {start} or {end} is not an open cell");
        return Path::default();
    }

    let cell_count = grid.width() * grid.height();
    let mut visited = vec![false; cell_count];
    let mut parent: Vec<Option<usize>> = vec![None; cell_count];
    let mut queue = VecDeque::new();

    let start_idx = grid.index(start);
    let end_idx = grid.index(end);
    visited[start_idx] = true;
    queue.push_back(start);

    let mut found = false;
    while let Some(current) = queue.pop_front() {
        if current == end {
            found = true;
            break;
        }
        let current_idx = grid.index(current);
        for next in grid.neighbors4(current) {
            let idx = grid.index(next);
            if !visited[idx] && grid.is_open(next) {
                visited[idx] = true;
                parent[idx] = Some(current_idx);
                queue.push_back(next);
            }
        }
    }

    if !found {
        log::debug!("No path: {end} is unreachable from {start}");
        return Path::default();
    }

    // Walk predecessor links back from the end, then reverse
    let mut cells = vec![end];
    let mut cursor = end_idx;
    while let Some(prev) = parent[cursor] {
        cells.push(grid.coord(prev));
        cursor = prev;
    }
    cells.reverse();

    debug_assert_eq!(cells.first(), Some(&start));
    Path(cells)
}
