//! Validated round-trip corridors the snake can safely enter and exit
//! (spec §3/§4.5).

use ahash::AHashSet;

use crate::error::SolverResult;
use crate::geometry::Pos;
use crate::grid::{Grid, EMPTY};
use crate::outside::OutsideRegion;
use crate::pathfinder::Pathfinder;
use crate::snake::Snake;
use crate::solver::SolverLimits;

/// Sentinel priority for a tunnel that clears no cell of the target color
/// at all (spec §3: "infinite" priority).
pub const INFINITE_PRIORITY: f64 = 99_999.0;

/// Per-step cost penalty for stepping onto a cell of the target color
/// during escape/return search (spec §4.5 step 2).
const TARGET_COLOR_STEP_PENALTY: i32 = 1000;

/// An ordered head trajectory `P_0, ..., P_{L-1}` through a validated
/// round trip: the snake can travel the corridor from `P_0`, consume the
/// cells along the way, and still reach the exterior from the far end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tunnel {
    points: Vec<Pos>,
}

impl Tunnel {
    fn new(points: Vec<Pos>) -> Self {
        Self { points }
    }

    pub fn to_array(&self) -> &[Pos] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Entry point of the corridor -- the cell the solver routes the head
    /// to before traversing the tunnel.
    pub fn entry(&self) -> Option<Pos> {
        self.points.first().copied()
    }

    /// `w / c` where `c` is the count of distinct cells of color exactly
    /// `target_color` on the path and `w` is the total color deficit of
    /// distinct cells strictly below `target_color` (spec §3). A tunnel
    /// that clears no target-color cell gets the "infinite" sentinel,
    /// which sorts first since higher priority wins.
    pub fn priority(&self, grid: &Grid, target_color: u8) -> f64 {
        let mut seen: AHashSet<Pos> = AHashSet::default();
        let mut c: u32 = 0;
        let mut w: u32 = 0;
        for &p in &self.points {
            if !seen.insert(p) {
                continue;
            }
            let level = grid.get_safe(p);
            if level == target_color {
                c += 1;
            } else if level != EMPTY && level < target_color {
                w += (target_color - level) as u32;
            }
        }
        if c == 0 {
            INFINITE_PRIORITY
        } else {
            w as f64 / c as f64
        }
    }

    /// Materializes the explicit snake-state sequence by stepping through
    /// consecutive tunnel points as `(dx, dy)` deltas (spec §4.5),
    /// chronological order starting from `start`. Returns `None` if
    /// `start`'s head doesn't sit on the tunnel's entry point, or if a
    /// consecutive pair of tunnel points isn't a single orthogonal step
    /// (both programmer errors -- a tunnel's own invariant guarantees
    /// Manhattan continuity).
    pub fn get_path(&self, start: &Snake) -> Option<Vec<Snake>> {
        if self.points.is_empty() || start.head() != self.points[0] {
            return None;
        }
        let mut states = Vec::with_capacity(self.points.len());
        let mut current = start.clone();
        states.push(current.clone());
        for window in self.points.windows(2) {
            let dx = window[1].x - window[0].x;
            let dy = window[1].y - window[0].y;
            if dx.abs() + dy.abs() != 1 {
                return None;
            }
            current = current.stepped(dx, dy);
            states.push(current.clone());
        }
        Some(states)
    }

    /// Prunes stale points from both ends: points now EMPTY on `grid`, or
    /// in the externally-consumed set `to_delete`. Interior points are left
    /// untouched; a tunnel whose interior has since been cut is revalidated
    /// by re-running `find_best_tunnel` on the source cell, not patched here
    /// (spec §4.5).
    pub fn update(&mut self, grid: &Grid, to_delete: &AHashSet<Pos>) {
        let stale = |p: Pos| Grid::is_empty_level(grid.get_safe(p)) || to_delete.contains(&p);
        while self.points.first().is_some_and(|&p| stale(p)) {
            self.points.remove(0);
        }
        while self.points.last().is_some_and(|&p| stale(p)) {
            self.points.pop();
        }
    }
}

fn default_admissible(
    grid: &Grid,
    snake: &Snake,
    dx: i32,
    dy: i32,
    target_color: u8,
    eps: i32,
) -> bool {
    let new_head = snake.head().offset(dx, dy);
    grid.is_inside_large(eps, new_head)
        && !snake.will_self_collide(dx, dy)
        && grid.get_safe(new_head) <= target_color
}

fn step_cost(grid: &Grid, snake: &Snake, dx: i32, dy: i32, target_color: u8) -> i32 {
    let new_head = snake.head().offset(dx, dy);
    if grid.get_safe(new_head) == target_color {
        1 + TARGET_COLOR_STEP_PENALTY
    } else {
        1
    }
}

/// Runs the escape-style weighted search shared by both legs of a tunnel
/// (spec §4.5 step 2): admissibility is bounded by `target_color`, a step
/// onto a target-color cell is discouraged by a cost penalty, and the
/// search stops as soon as `goal` is satisfied. Returns the chronological
/// state sequence (start first) or `None` if the frontier empties.
fn weighted_search<Goal>(
    grid: &Grid,
    start: &Snake,
    target_color: u8,
    limits: &SolverLimits,
    goal: Goal,
) -> SolverResult<Option<Vec<Snake>>>
where
    Goal: Fn(&Snake) -> bool,
{
    let pf = Pathfinder::new(grid, limits);
    let eps = limits.large_bound_eps;
    let result = pf.run_search(
        start,
        |snake, dx, dy| default_admissible(grid, snake, dx, dy, target_color, eps),
        goal,
        |_snake| 0,
        |snake, dx, dy| step_cost(grid, snake, dx, dy, target_color),
    )?;
    Ok(result.map(|mut goal_to_start| {
        goal_to_start.reverse();
        goal_to_start
    }))
}

/// Builds the round-trip tunnel rooted at `start` for `target_color`
/// (spec §4.5). Returns `None` if either leg of the round trip fails --
/// the cell is truly trapped.
pub fn find_best_tunnel(
    grid: &Grid,
    outside: &OutsideRegion,
    start: Pos,
    target_color: u8,
    n: usize,
    limits: &SolverLimits,
) -> SolverResult<Option<Tunnel>> {
    let seed = match Snake::of_single_point(start, n) {
        Ok(s) => s,
        Err(_) => return Ok(None),
    };

    let Some(escape_path) = weighted_search(grid, &seed, target_color, limits, |snake| {
        outside.is_outside(snake.head())
    })?
    else {
        return Ok(None);
    };

    let escape_heads: Vec<Pos> = escape_path.iter().map(|s| s.head()).collect();

    // Simulate consumption on a throwaway clone; the real grid is only
    // mutated by the solver once it commits to this tunnel.
    let mut consumed = grid.clone();
    for &p in &escape_heads {
        consumed.set_safe(p, EMPTY);
    }

    let mut outside_after = outside.clone();
    outside_after.update(&consumed, target_color);

    let return_seed = escape_path.last().expect("escape path is never empty").clone();

    // Round-trip guarantee: after traversing and consuming, the *whole*
    // snake -- not just the head -- must still be able to clear the
    // corridor, or the next food it chases could strand the tail inside.
    let Some(return_path) = weighted_search(&consumed, &return_seed, target_color, limits, |snake| {
        snake.segments().all(|p| outside_after.is_outside(p))
    })?
    else {
        return Ok(None);
    };

    let return_heads: Vec<Pos> = return_path.iter().map(|s| s.head()).collect();

    let mut points = escape_heads;
    points.extend(return_heads);

    let tunnel = trim(points, grid);
    Ok(if tunnel.is_empty() { None } else { Some(tunnel) })
}

/// Drops leading/trailing points already EMPTY on the (non-cloned) grid,
/// and drops trailing points that duplicate an earlier position -- the
/// round-trip tail re-entering the escape leg at the seam (spec §4.5
/// step 6).
fn trim(points: Vec<Pos>, grid: &Grid) -> Tunnel {
    let mut start = 0;
    let mut end = points.len();
    while start < end && Grid::is_empty_level(grid.get_safe(points[start])) {
        start += 1;
    }
    while end > start && Grid::is_empty_level(grid.get_safe(points[end - 1])) {
        end -= 1;
    }

    let mut trimmed = points[start..end].to_vec();
    while trimmed.len() > 1 {
        let last = *trimmed.last().unwrap();
        if trimmed[..trimmed.len() - 1].contains(&last) {
            trimmed.pop();
        } else {
            break;
        }
    }

    Tunnel::new(trimmed)
}
