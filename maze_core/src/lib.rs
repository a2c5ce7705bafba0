// lib.rs - Grid model, maze carving and shortest-path search
// Pure data + algorithms; the scene renderer consumes these from gpu_renderer.

pub mod error;
pub mod generator;
pub mod grid;
pub mod solver;

// Re-export commonly used types
pub use error::{MazeError, Result};
pub use generator::{generate, generate_seeded};
pub use grid::{Cell, Coord, Grid};
pub use solver::{shortest_path, Path};
