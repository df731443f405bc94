use thiserror::Error;

use crate::geometry::Pos;

/// The fatal error kinds that escape the solver boundary.
///
/// Recoverable failures ("no path", "no tunnel") never appear here: they are
/// carried internally as `Option`s and silently skipped by the solver.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SolverError {
    #[error("position ({x}, {y}) is out of bounds for a {width}x{height} grid", x = .0.x, y = .0.y, width = .1, height = .2)]
    Bounds(Pos, usize, usize),

    #[error("a snake must have at least one segment")]
    EmptySnake,

    #[error("grid cell level {level} exceeds the declared maximum color {max_color}")]
    InvalidColorOrdering { level: u8, max_color: u8 },

    #[error("search exhausted the configured frontier limit of {limit} nodes")]
    SearchExhausted { limit: usize },
}

pub type SolverResult<T> = Result<T, SolverError>;
