//! Flood-fill-gated-by-color-ceiling reachability bitmap.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

use crate::geometry::Pos;
use crate::grid::{Grid, EMPTY};

/// A cell is "outside" if it is out of bounds, or flagged in the bitmap:
/// reachable from the exterior through cells of level <= a color ceiling.
#[derive(Debug, Clone)]
pub struct OutsideRegion {
    flags: FixedBitSet,
    width: usize,
    height: usize,
}

impl OutsideRegion {
    pub fn new(grid: &Grid) -> Self {
        Self::with_threshold(grid, EMPTY)
    }

    pub fn with_threshold(grid: &Grid, threshold: u8) -> Self {
        let mut region = Self {
            flags: FixedBitSet::with_capacity(grid.width() * grid.height()),
            width: grid.width(),
            height: grid.height(),
        };
        region.update(grid, threshold);
        region
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x as usize >= self.width || pos.y as usize >= self.height
        {
            None
        } else {
            Some(pos.y as usize * self.width + pos.x as usize)
        }
    }

    /// True for out-of-bounds coordinates or cells flagged outside.
    pub fn is_outside(&self, pos: Pos) -> bool {
        match self.index(pos) {
            None => true,
            Some(i) => self.flags[i],
        }
    }

    /// Recomputes the bitmap against `grid` and a (possibly new) color
    /// ceiling `c`, reusing the existing bitmap as the starting frontier.
    /// The outside set is monotone, so this is a pure fixed-point grow,
    /// never a from-scratch recompute.
    pub fn update(&mut self, grid: &Grid, c: u8) {
        let mut queue: VecDeque<Pos> = VecDeque::new();
        for i in self.flags.ones() {
            let x = (i % self.width) as i32;
            let y = (i / self.width) as i32;
            queue.push_back(Pos::new(x, y));
        }

        // Seed every in-bounds cell adjacent to an out-of-bounds neighbor.
        for y in 0..self.height as i32 {
            for x in 0..self.width as i32 {
                let pos = Pos::new(x, y);
                let idx = self.index(pos).unwrap();
                if self.flags[idx] {
                    continue;
                }
                let level = grid.get_safe(pos);
                if level > c {
                    continue;
                }
                let touches_outside = pos
                    .neighbors()
                    .into_iter()
                    .any(|n| self.index(n).is_none());
                if touches_outside {
                    self.flags.set(idx, true);
                    queue.push_back(pos);
                }
            }
        }

        while let Some(pos) = queue.pop_front() {
            for neighbor in pos.neighbors() {
                let Some(n_idx) = self.index(neighbor) else {
                    continue;
                };
                if self.flags[n_idx] {
                    continue;
                }
                if grid.get_safe(neighbor) > c {
                    continue;
                }
                self.flags.set(n_idx, true);
                queue.push_back(neighbor);
            }
        }
    }
}
