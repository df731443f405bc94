//! The dense board of cell levels the solver consumes.

use crate::error::{SolverError, SolverResult};
use crate::geometry::{Pos, LARGE_BOUND_EPS};

/// The sentinel level denoting an unoccupied cell.
pub const EMPTY: u8 = 0;

/// A dense `width * height` array of cell levels.
///
/// Out-of-bounds coordinates are never stored; they are conceptually EMPTY.
/// The solver clones its input grid once and mutates only the clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    levels: Vec<u8>,
    width: usize,
    height: usize,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            levels: vec![EMPTY; width * height],
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_inside(&self, pos: Pos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// True iff `pos` lies within `eps` cells of the grid on every side --
    /// the "large bound" used by pathfinding admissibility so the head may
    /// park or maneuver just outside the visible grid.
    pub fn is_inside_large(&self, eps: i32, pos: Pos) -> bool {
        pos.x >= -eps
            && pos.y >= -eps
            && pos.x < self.width as i32 + eps
            && pos.y < self.height as i32 + eps
    }

    pub fn is_inside_large_default(&self, pos: Pos) -> bool {
        self.is_inside_large(LARGE_BOUND_EPS, pos)
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        self.is_inside(pos)
            .then(|| pos.y as usize * self.width + pos.x as usize)
    }

    /// Bounds-checked read. Fails with `SolverError::Bounds` outside the grid.
    pub fn get(&self, pos: Pos) -> SolverResult<u8> {
        self.index(pos)
            .map(|i| self.levels[i])
            .ok_or(SolverError::Bounds(pos, self.width, self.height))
    }

    /// Returns EMPTY for out-of-bounds reads instead of failing; the
    /// "safe" accessor callers use when a coordinate may legitimately sit
    /// off-grid (e.g. a tunnel endpoint parked outside).
    pub fn get_safe(&self, pos: Pos) -> u8 {
        self.index(pos).map(|i| self.levels[i]).unwrap_or(EMPTY)
    }

    /// Bounds-checked write. Fails with `SolverError::Bounds` outside the grid.
    pub fn set(&mut self, pos: Pos, level: u8) -> SolverResult<()> {
        let index = self
            .index(pos)
            .ok_or(SolverError::Bounds(pos, self.width, self.height))?;
        self.levels[index] = level;
        Ok(())
    }

    /// Silently drops out-of-bounds writes instead of failing -- the
    /// "safe-set" callers reach for when a coordinate may legitimately sit
    /// off-grid (e.g. a tunnel endpoint parked outside).
    pub fn set_safe(&mut self, pos: Pos, level: u8) {
        if let Some(index) = self.index(pos) {
            self.levels[index] = level;
        }
    }

    pub fn set_empty(&mut self, pos: Pos) -> SolverResult<()> {
        self.set(pos, EMPTY)
    }

    pub fn is_empty_level(level: u8) -> bool {
        level == EMPTY
    }

    /// The maximum level stored anywhere on the grid (0 if every cell is
    /// EMPTY). Used to infer `M`, the number of colors, when the caller
    /// does not supply one explicitly.
    pub fn max_level(&self) -> u8 {
        self.levels.iter().copied().max().unwrap_or(EMPTY)
    }

    /// Iterate over every cell's position and level, row-major.
    pub fn iter(&self) -> impl Iterator<Item = (Pos, u8)> + '_ {
        self.levels.iter().enumerate().map(move |(i, &level)| {
            let x = (i % self.width) as i32;
            let y = (i / self.width) as i32;
            (Pos::new(x, y), level)
        })
    }
}
