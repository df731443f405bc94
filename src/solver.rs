//! The orchestrator: per-color residual + clean phases.

use ahash::AHashSet;
use tracing::{debug, trace};

use crate::error::{SolverError, SolverResult};
use crate::geometry::{Pos, LARGE_BOUND_EPS};
use crate::grid::{Grid, EMPTY};
use crate::outside::OutsideRegion;
use crate::pathfinder::Pathfinder;
use crate::snake::Snake;
use crate::tunnel::{find_best_tunnel, Tunnel};

/// Defensive limits the solver imposes on its own searches: a frontier-size
/// ceiling and the "large bound" margin, both with sane defaults a caller
/// can override.
#[derive(Debug, Clone, Copy)]
pub struct SolverLimits {
    /// Frontier-size ceiling before a search fails with `SearchExhausted`
    /// instead of running unbounded.
    pub max_frontier_size: usize,
    /// The "large bound" margin the snake may loiter past the grid's edge
    /// while maneuvering. A single fixed constant by default, but exposed
    /// here so tests can shrink it for tiny scenario grids.
    pub large_bound_eps: i32,
}

impl Default for SolverLimits {
    fn default() -> Self {
        Self {
            max_frontier_size: 200_000,
            large_bound_eps: LARGE_BOUND_EPS,
        }
    }
}

/// A working entry used by the residual phase: a cell, its best known
/// tunnel, and that tunnel's priority.
struct TunnelablePoint {
    cell: Pos,
    tunnel: Tunnel,
    priority: f64,
}

/// Owns the grid clone and the emitted chain. The `OutsideRegion` bitmap is
/// only needed once there is at least one non-empty cell to clear, so
/// `solve` builds it locally instead of holding it here -- an all-EMPTY
/// grid never allocates one.
pub struct Solver {
    grid: Grid,
    max_color: u8,
    limits: SolverLimits,
    n: usize,
}

impl Solver {
    /// Clones `grid` -- the caller's original is never mutated. `max_color`,
    /// when given, must not be smaller than the highest level actually
    /// present; a smaller declared ceiling is an `InvalidColorOrdering`
    /// rejection at construction.
    pub fn new(grid: &Grid, max_color: Option<u8>) -> SolverResult<Self> {
        Self::with_limits(grid, max_color, SolverLimits::default())
    }

    pub fn with_limits(
        grid: &Grid,
        max_color: Option<u8>,
        limits: SolverLimits,
    ) -> SolverResult<Self> {
        let grid = grid.clone();
        let inferred_max = grid.max_level();
        let max_color = max_color.unwrap_or(inferred_max);
        if inferred_max > max_color {
            return Err(SolverError::InvalidColorOrdering {
                level: inferred_max,
                max_color,
            });
        }
        Ok(Self {
            grid,
            max_color,
            limits,
            n: 0,
        })
    }

    /// Runs the full solve: residual + clean phases per color, ascending.
    /// Returns the chronological state sequence, `start` first, final
    /// resting snake last. An all-EMPTY grid (`max_color == 0`) returns
    /// immediately without allocating an `OutsideRegion` or `Pathfinder`.
    pub fn solve(&mut self, start: &Snake) -> SolverResult<Vec<Snake>> {
        self.n = start.len();
        let mut chain: Vec<Snake> = vec![start.clone()];

        if self.max_color == 0 {
            return Ok(chain);
        }

        let mut outside = OutsideRegion::new(&self.grid);

        for target_color in 1..=self.max_color {
            outside.update(&self.grid, target_color);
            if target_color > 1 {
                self.clear_residual_layer(&mut chain, target_color, &mut outside)?;
                outside.update(&self.grid, target_color);
            }
            self.clear_clean_layer(&mut chain, target_color, &mut outside)?;
        }

        chain.reverse();
        Ok(chain)
    }

    /// Clears leftovers of colors below `target_color` using prioritized
    /// tunnels.
    fn clear_residual_layer(
        &mut self,
        chain: &mut Vec<Snake>,
        target_color: u8,
        outside: &mut OutsideRegion,
    ) -> SolverResult<()> {
        let mut candidates = self.build_tunnelable_points(outside, target_color, |level| {
            level != EMPTY && level < target_color
        })?;

        while !candidates.is_empty() {
            let max_priority = candidates
                .iter()
                .map(|c| c.priority)
                .fold(f64::NEG_INFINITY, f64::max);

            let head = chain[0].head();
            let best_idx = candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.priority == max_priority)
                .min_by_key(|(_, c)| {
                    c.tunnel
                        .entry()
                        .map(|e| e.distance_squared(head))
                        .unwrap_or(i64::MAX)
                })
                .map(|(idx, _)| idx)
                .expect("candidates is non-empty");

            let chosen = candidates.remove(best_idx);
            let Some(entry) = chosen.tunnel.entry() else {
                continue;
            };

            let pf = Pathfinder::new(&self.grid, &self.limits);
            let Some(mut route) = pf.find_path_to_cell(&chain[0], entry, target_color)? else {
                trace!(cell = ?chosen.cell, "residual tunnel entry no longer reachable, skipping");
                continue;
            };
            // route is goal-to-start, start duplicates chain[0].
            route.pop();
            chain.splice(0..0, route);

            let Some(mut tunnel_path) = chosen.tunnel.get_path(&chain[0]) else {
                continue;
            };
            // Consume every cell of the tunnel itself, including the entry
            // cell, which the traversal states alone don't cover (the
            // entry's state duplicates chain[0] and is dropped next).
            for &p in chosen.tunnel.to_array() {
                self.grid.set_safe(p, EMPTY);
            }
            tunnel_path.remove(0); // duplicates chain[0]
            tunnel_path.reverse(); // chronological -> newest-first
            chain.splice(0..0, tunnel_path);

            outside.update(&self.grid, target_color);

            candidates = self.revalidate(outside, candidates, target_color)?;
        }

        debug!(target_color, "residual phase complete");
        Ok(())
    }

    /// Consumes every remaining cell of color `<= target_color` by
    /// nearest-first BFS.
    fn clear_clean_layer(
        &mut self,
        chain: &mut Vec<Snake>,
        target_color: u8,
        outside: &mut OutsideRegion,
    ) -> SolverResult<()> {
        let mut goal_cells: AHashSet<Pos> = AHashSet::default();
        for (pos, level) in self.grid.iter() {
            if level == EMPTY || level > target_color {
                continue;
            }
            if let Some(tunnel) =
                find_best_tunnel(&self.grid, outside, pos, target_color, self.n, &self.limits)?
            {
                for &p in tunnel.to_array() {
                    if !Grid::is_empty_level(self.grid.get_safe(p)) {
                        goal_cells.insert(p);
                    }
                }
            }
        }

        while !goal_cells.is_empty() {
            let pf = Pathfinder::new(&self.grid, &self.limits);
            let Some(mut route) = pf.find_path_to_any_cell(&chain[0], &goal_cells, target_color)?
            else {
                trace!(
                    target_color,
                    remaining = goal_cells.len(),
                    "no remaining clean-phase cell is reachable, stopping"
                );
                break;
            };

            let reached = route[0].head();
            goal_cells.remove(&reached);
            route.pop(); // duplicates chain[0]

            for state in &route {
                self.grid.set_safe(state.head(), EMPTY);
            }
            chain.splice(0..0, route);
        }

        outside.update(&self.grid, target_color);
        debug!(target_color, "clean phase complete");
        Ok(())
    }

    fn build_tunnelable_points(
        &self,
        outside: &OutsideRegion,
        target_color: u8,
        include_level: impl Fn(u8) -> bool,
    ) -> SolverResult<Vec<TunnelablePoint>> {
        let mut points = Vec::new();
        for (pos, level) in self.grid.iter() {
            if !include_level(level) {
                continue;
            }
            if let Some(tunnel) = find_best_tunnel(
                &self.grid,
                outside,
                pos,
                target_color,
                self.n,
                &self.limits,
            )? {
                if !tunnel.is_empty() {
                    let priority = tunnel.priority(&self.grid, target_color);
                    points.push(TunnelablePoint {
                        cell: pos,
                        tunnel,
                        priority,
                    });
                }
            }
        }
        Ok(points)
    }

    fn revalidate(
        &self,
        outside: &OutsideRegion,
        candidates: Vec<TunnelablePoint>,
        target_color: u8,
    ) -> SolverResult<Vec<TunnelablePoint>> {
        let mut revalidated = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if Grid::is_empty_level(self.grid.get_safe(candidate.cell)) {
                continue;
            }
            if let Some(tunnel) = find_best_tunnel(
                &self.grid,
                outside,
                candidate.cell,
                target_color,
                self.n,
                &self.limits,
            )? {
                if !tunnel.is_empty() {
                    let priority = tunnel.priority(&self.grid, target_color);
                    revalidated.push(TunnelablePoint {
                        cell: candidate.cell,
                        tunnel,
                        priority,
                    });
                    continue;
                }
            }
        }
        Ok(revalidated)
    }
}
