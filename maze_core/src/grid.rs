// grid.rs - Fixed-size occupancy grid of walls and open cells

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MazeError, Result};

/// Binary cell state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    Wall,
    Open,
}

/// Integer grid coordinate, `0 <= x < width`, `0 <= y < height`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    #[inline]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Offset by a signed step; `None` when either component would go negative.
    #[inline]
    pub fn offset(self, dx: isize, dy: isize) -> Option<Coord> {
        Some(Coord::new(
            self.x.checked_add_signed(dx)?,
            self.y.checked_add_signed(dy)?,
        ))
    }

    /// True when the two coordinates differ by exactly one step on one axis.
    #[inline]
    pub fn is_adjacent(self, other: Coord) -> bool {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) == 1
    }
}

impl From<(usize, usize)> for Coord {
    #[inline]
    fn from((x, y): (usize, usize)) -> Self {
        Coord::new(x, y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Fail unless both dimensions are odd and at least 3.
pub fn validate_dimensions(width: usize, height: usize) -> Result<()> {
    let valid = |d: usize| d >= 3 && d % 2 == 1;
    if valid(width) && valid(height) {
        Ok(())
    } else {
        Err(MazeError::InvalidDimension { width, height })
    }
}

/// Rectangular wall/open grid stored row-major in one contiguous buffer.
///
/// Grids produced by the generator are never mutated afterwards; the only
/// mutation entry point (`open`) is crate-private.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "GridRepr", try_from = "GridRepr")]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// A grid with every cell set to WALL.
    pub fn filled(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Wall; width * height],
        }
    }

    /// Parse the `#` / `.` text form. Spaces also count as open cells.
    pub fn from_ascii(text: &str) -> Result<Self> {
        let mut rows: Vec<&str> = text.lines().map(|line| line.trim_end_matches('\r')).collect();
        // Blank lines only at the edges; an all-space row inside is a row of open cells
        while rows.last().is_some_and(|line| line.is_empty()) {
            rows.pop();
        }
        let leading = rows.iter().take_while(|line| line.is_empty()).count();
        rows.drain(..leading);

        let Some(first) = rows.first() else {
            return Err(MazeError::Parse {
                line: 0,
                reason: "no rows".to_string(),
            });
        };

        let width = first.chars().count();
        let height = rows.len();
        let mut cells = Vec::with_capacity(width * height);

        for (line, row) in rows.iter().enumerate() {
            let len = row.chars().count();
            if len != width {
                return Err(MazeError::Parse {
                    line: line + 1,
                    reason: format!("expected {width} columns, found {len}"),
                });
            }
            for c in row.chars() {
                cells.push(match c {
                    '#' => Cell::Wall,
                    '.' | ' ' => Cell::Open,
                    other => {
                        return Err(MazeError::Parse {
                            line: line + 1,
                            reason: format!("unexpected character {other:?}"),
                        })
                    }
                });
            }
        }

        Ok(Self { width, height, cells })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn in_bounds(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    /// Arena index for a coordinate known to be in bounds.
    #[inline]
    pub(crate) fn index(&self, coord: Coord) -> usize {
        coord.y * self.width + coord.x
    }

    #[inline]
    pub(crate) fn coord(&self, index: usize) -> Coord {
        Coord::new(index % self.width, index / self.width)
    }

    #[inline]
    pub fn get(&self, coord: Coord) -> Option<Cell> {
        self.in_bounds(coord).then(|| self.cells[self.index(coord)])
    }

    #[inline]
    pub fn is_open(&self, coord: Coord) -> bool {
        self.get(coord) == Some(Cell::Open)
    }

    #[inline]
    pub(crate) fn open(&mut self, coord: Coord) {
        let idx = self.index(coord);
        self.cells[idx] = Cell::Open;
    }

    /// Row-major iteration over every cell.
    pub fn cells(&self) -> impl Iterator<Item = (Coord, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &cell)| (self.coord(i), cell))
    }

    pub fn open_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells()
            .filter(|&(_, cell)| cell == Cell::Open)
            .map(|(coord, _)| coord)
    }

    pub fn wall_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells()
            .filter(|&(_, cell)| cell == Cell::Wall)
            .map(|(coord, _)| coord)
    }

    pub fn open_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c == Cell::Open).count()
    }

    /// Number of OPEN-to-OPEN 4-adjacent pairs, each pair counted once.
    pub fn open_edge_count(&self) -> usize {
        self.open_cells()
            .map(|c| {
                let right = c.offset(1, 0).map_or(false, |n| self.is_open(n));
                let down = c.offset(0, 1).map_or(false, |n| self.is_open(n));
                right as usize + down as usize
            })
            .sum()
    }

    /// In-bounds 4-neighbours in the fixed expansion order +x, -x, +y, -y.
    pub fn neighbors4(&self, coord: Coord) -> impl Iterator<Item = Coord> + '_ {
        const STEPS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
        STEPS
            .iter()
            .filter_map(move |&(dx, dy)| coord.offset(dx, dy))
            .filter(move |&n| self.in_bounds(n))
    }

    /// Connected from (1,1) and free of cycles.
    pub fn is_spanning_tree(&self) -> bool {
        let root = Coord::new(1, 1);
        let open = self.open_count();
        if !self.is_open(root) {
            return false;
        }

        let mut seen = vec![false; self.cells.len()];
        let mut queue = VecDeque::from([root]);
        seen[self.index(root)] = true;
        let mut reached = 0usize;

        while let Some(current) = queue.pop_front() {
            reached += 1;
            for next in self.neighbors4(current) {
                let idx = self.index(next);
                if !seen[idx] && self.cells[idx] == Cell::Open {
                    seen[idx] = true;
                    queue.push_back(next);
                }
            }
        }

        reached == open && self.open_edge_count() + 1 == open
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width.max(1)) {
            for cell in row {
                f.write_str(match cell {
                    Cell::Wall => "#",
                    Cell::Open => ".",
                })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Serialized form: dimensions plus one text row per grid row.
#[derive(Serialize, Deserialize)]
struct GridRepr {
    width: usize,
    height: usize,
    rows: Vec<String>,
}

impl From<Grid> for GridRepr {
    fn from(grid: Grid) -> Self {
        let text = grid.to_string();
        Self {
            width: grid.width,
            height: grid.height,
            rows: text.lines().map(str::to_owned).collect(),
        }
    }
}

impl TryFrom<GridRepr> for Grid {
    type Error = MazeError;

    fn try_from(repr: GridRepr) -> Result<Self> {
        let grid = Grid::from_ascii(&repr.rows.join("\n"))?;
        if grid.width != repr.width || grid.height != repr.height {
            return Err(MazeError::Parse {
                line: 0,
                reason: format!(
                    "declared {}x{} but rows describe {}x{}",
                    repr.width, repr.height, grid.width, grid.height
                ),
            });
        }
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLUS: &str = "\
#####
#...#
#.#.#
#...#
#####
";

    #[test]
    fn test_validate_dimensions() {
        assert!(validate_dimensions(3, 3).is_ok());
        assert!(validate_dimensions(51, 31).is_ok());
        assert_eq!(
            validate_dimensions(4, 5),
            Err(MazeError::InvalidDimension { width: 4, height: 5 })
        );
        assert!(validate_dimensions(1, 5).is_err());
        assert!(validate_dimensions(5, 0).is_err());
    }

    #[test]
    fn test_ascii_round_trip() {
        let grid = Grid::from_ascii(PLUS).unwrap();
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.height(), 5);
        assert_eq!(grid.to_string(), PLUS);
        assert!(grid.is_open(Coord::new(1, 1)));
        assert!(!grid.is_open(Coord::new(2, 2)));
        assert_eq!(grid.get(Coord::new(5, 0)), None);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Grid::from_ascii("###\n#.\n###").unwrap_err();
        assert!(matches!(err, MazeError::Parse { line: 2, .. }));
        assert!(Grid::from_ascii("#x#").is_err());
        assert!(Grid::from_ascii("").is_err());
    }

    #[test]
    fn test_all_space_row_is_kept() {
        let grid = Grid::from_ascii("\n###\n   \n###\n\n").unwrap();
        assert_eq!((grid.width(), grid.height()), (3, 3));
        assert!(grid.is_open(Coord::new(1, 1)));
        assert!(grid.is_open(Coord::new(0, 1)));
        assert!(!grid.is_open(Coord::new(1, 2)));

        let json = serde_json::json!({ "width": 3, "height": 3, "rows": ["###", "   ", "###"] });
        let back: Grid = serde_json::from_value(json).unwrap();
        assert_eq!(back, grid);
    }

    #[test]
    fn test_edge_counting_detects_cycle() {
        // The ring around the centre pillar is a cycle: 8 open cells, 8 edges
        let grid = Grid::from_ascii(PLUS).unwrap();
        assert_eq!(grid.open_count(), 8);
        assert_eq!(grid.open_edge_count(), 8);
        assert!(!grid.is_spanning_tree());
    }

    #[test]
    fn test_neighbor_order_is_fixed() {
        let grid = Grid::filled(3, 3);
        let order: Vec<Coord> = grid.neighbors4(Coord::new(1, 1)).collect();
        assert_eq!(
            order,
            vec![
                Coord::new(2, 1),
                Coord::new(0, 1),
                Coord::new(1, 2),
                Coord::new(1, 0)
            ]
        );
        // Corner drops the out-of-bounds candidates
        assert_eq!(grid.neighbors4(Coord::new(0, 0)).count(), 2);
    }

    #[test]
    fn test_serde_uses_rows() {
        let grid = Grid::from_ascii(PLUS).unwrap();
        let json = serde_json::to_value(&grid).unwrap();
        assert_eq!(json["width"], 5);
        assert_eq!(json["rows"][1], "#...#");

        let back: Grid = serde_json::from_value(json).unwrap();
        assert_eq!(back, grid);
    }
}
