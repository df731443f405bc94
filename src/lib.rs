//! Deterministic pathfinding core for an animated contribution-grid snake.
//!
//! Given a [`Grid`] of colored cells and a starting [`Snake`], [`Solver`]
//! produces the full chronological sequence of snake states that clears
//! every cell, lowest color first and nearest-first within each color,
//! using validated round-trip [`Tunnel`]s to duck in and out of pockets
//! the snake can't simply walk through.
//!
//! ```
//! use snake_solver::{Grid, Snake, Pos, Solver};
//!
//! let mut grid = Grid::new(4, 4);
//! grid.set(Pos::new(2, 2), 1).unwrap();
//!
//! let start = Snake::of_points(vec![Pos::new(-1, 0), Pos::new(-2, 0)]).unwrap();
//! let mut solver = Solver::new(&grid, None).unwrap();
//! let chain = solver.solve(&start).unwrap();
//!
//! assert_eq!(chain[0], start);
//! assert!(chain.iter().any(|s| s.head() == Pos::new(2, 2)));
//! ```

pub mod error;
pub mod geometry;
pub mod grid;
pub mod outside;
pub mod pathfinder;
pub mod snake;
pub mod solver;
pub mod tunnel;

pub use error::{SolverError, SolverResult};
pub use geometry::{Pos, LARGE_BOUND_EPS};
pub use grid::{Grid, EMPTY};
pub use outside::OutsideRegion;
pub use pathfinder::Pathfinder;
pub use snake::Snake;
pub use solver::{Solver, SolverLimits};
pub use tunnel::{Tunnel, INFINITE_PRIORITY};
