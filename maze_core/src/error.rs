// error.rs - Maze construction errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MazeError {
    /// Width and height must both be odd and at least 3.
    #[error("Invalid maze dimensions {width}x{height}: both must be odd and >= 3")]
    InvalidDimension { width: usize, height: usize },

    #[error("Malformed maze text at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, MazeError>;
