//! A* / weighted BFS over snake states.
//!
//! Two public searches are exposed: head-to-cell (true A*, Manhattan
//! heuristic) and head-to-any-of-several-cells (uniform cost). Both share
//! one generic search engine parameterized by admissibility, goal,
//! heuristic and step-cost closures, since Tunnel's escape/return search
//! needs the same frontier discipline with a different goal predicate and
//! step cost.

use ahash::AHashSet;

use crate::error::{SolverError, SolverResult};
use crate::geometry::{Pos, NEIGHBOR_OFFSETS};
use crate::grid::Grid;
use crate::snake::Snake;
use crate::solver::SolverLimits;

/// A short-lived helper bound to a `Grid` reference. Carries no state
/// across calls other than the grid it searches; the color ceiling a
/// search runs under is an explicit `max_color` argument on each call
/// rather than a mutable field, since every call in this crate already
/// knows its ceiling up front.
pub struct Pathfinder<'a> {
    grid: &'a Grid,
    frontier_limit: usize,
    eps: i32,
}

struct SearchNode {
    snake: Snake,
    g_cost: i32,
    f_cost: i32,
    parent: Option<usize>,
}

impl<'a> Pathfinder<'a> {
    /// How many of the target's near-head segments `find_path_to_pose`
    /// treats as forbidden ground for the head-route search. A "short
    /// prefix" per spec §4.4, not the whole remaining body.
    const POSE_FORBIDDEN_PREFIX_LEN: usize = 2;

    pub fn new(grid: &'a Grid, limits: &SolverLimits) -> Self {
        Self {
            grid,
            frontier_limit: limits.max_frontier_size,
            eps: limits.large_bound_eps,
        }
    }

    /// Head-to-cell search. Admissible moves keep the head within the large
    /// bound, never self-collide, and land on a cell whose level is
    /// `<= max_color` (out-of-bounds destinations are always admissible).
    /// Returns the shortest route ordered goal-to-start, *including* the
    /// start state. `Ok(None)` means no admissible route exists.
    pub fn find_path_to_cell(
        &self,
        start: &Snake,
        target: Pos,
        max_color: u8,
    ) -> SolverResult<Option<Vec<Snake>>> {
        if start.head() == target {
            return Ok(Some(vec![start.clone()]));
        }

        let grid = self.grid;
        let eps = self.eps;
        self.run_search(
            start,
            move |snake, dx, dy| Self::default_admissible(grid, snake, dx, dy, max_color, eps),
            move |snake| snake.head() == target,
            move |snake| snake.head().manhattan_distance(target),
            |_snake, _dx, _dy| 1,
        )
    }

    /// Head-to-any-of-`targets` search: the clean phase's multi-source BFS,
    /// which stops at whichever target cell is reached first. No
    /// single-cell heuristic applies with multiple goals, so this runs as
    /// a uniform-cost search (all steps cost 1, zero heuristic) rather than
    /// true A*. Returns the route goal-to-start, start included.
    pub fn find_path_to_any_cell(
        &self,
        start: &Snake,
        targets: &AHashSet<Pos>,
        max_color: u8,
    ) -> SolverResult<Option<Vec<Snake>>> {
        if targets.contains(&start.head()) {
            return Ok(Some(vec![start.clone()]));
        }

        let grid = self.grid;
        let eps = self.eps;
        self.run_search(
            start,
            move |snake, dx, dy| Self::default_admissible(grid, snake, dx, dy, max_color, eps),
            move |snake| targets.contains(&snake.head()),
            |_snake| 0,
            |_snake, _dx, _dy| 1,
        )
    }

    /// Pose-matching search (spec §4.4): finds a route whose final state
    /// equals `target` exactly. Two stages, per the spec's own wording:
    /// first route the head to `target.head()` while treating a short
    /// prefix of the target's body (the segments nearest the head) as
    /// forbidden ground, so the head-route can't prematurely occupy a cell
    /// the body is about to trail through, then execute the target's cell
    /// sequence "from the last-reached segment inward" -- i.e. step through
    /// `target.segment(1), target.segment(2), ...` in order, which shifts
    /// the body through the remaining target segments one at a time. Only
    /// the near segments need to be off-limits to the head route: farther
    /// segments are reachable ground the head is free to cross, since the
    /// body won't trail through them until after the head has moved on.
    /// Returns the route in chronological order (`start` first, `target`
    /// last), unlike `find_path_to_cell`'s goal-to-start convention --
    /// pinned by the open question in spec §9. `Ok(None)` covers both "no
    /// path" and a degenerate (non-positive-area) bounding box ("bounds
    /// overflow" in spec §4.4).
    pub fn find_path_to_pose(
        &self,
        start: &Snake,
        target: &Snake,
        max_color: u8,
    ) -> SolverResult<Option<Vec<Snake>>> {
        if start == target {
            return Ok(Some(vec![start.clone()]));
        }

        let n = target.len() as i32;
        let margin = n + 1;
        let min_x = start.head().x.min(target.head().x) - margin;
        let max_x = start.head().x.max(target.head().x) + margin;
        let min_y = start.head().y.min(target.head().y) - margin;
        let max_y = start.head().y.max(target.head().y) + margin;
        if max_x <= min_x || max_y <= min_y {
            return Ok(None);
        }

        let grid = self.grid;
        let eps = self.eps;
        let target_head = target.head();
        // Only the segments nearest the head are forbidden ground for the
        // head-route search -- a "short prefix", per spec §4.4, not the
        // whole remaining body. Segments past the prefix are cells the
        // head is free to cross; the body only reaches them once it
        // trails through later, well after the head route is done.
        let forbidden: AHashSet<Pos> = target
            .segments()
            .skip(1)
            .take(Self::POSE_FORBIDDEN_PREFIX_LEN)
            .collect();

        let head_route = self.run_search(
            start,
            move |snake, dx, dy| {
                let new_head = snake.head().offset(dx, dy);
                if new_head.x < min_x || new_head.x > max_x || new_head.y < min_y || new_head.y > max_y
                {
                    return false;
                }
                if forbidden.contains(&new_head) {
                    return false;
                }
                Self::default_admissible(grid, snake, dx, dy, max_color, eps)
            },
            move |snake| snake.head() == target_head,
            move |snake| snake.head().manhattan_distance(target_head),
            |_snake, _dx, _dy| 1,
        )?;

        let Some(mut route) = head_route else {
            return Ok(None);
        };
        route.reverse(); // goal-to-start -> chronological

        let mut current = route.last().expect("route is never empty").clone();
        for i in 1..target.len() {
            let prev = target.segment(i - 1);
            let next = target.segment(i);
            let dx = next.x - prev.x;
            let dy = next.y - prev.y;
            current = current.stepped(dx, dy);
            route.push(current.clone());
        }

        debug_assert_eq!(&current, target);
        Ok(Some(route))
    }

    fn default_admissible(
        grid: &Grid,
        snake: &Snake,
        dx: i32,
        dy: i32,
        max_color: u8,
        eps: i32,
    ) -> bool {
        let new_head = snake.head().offset(dx, dy);
        if !grid.is_inside_large(eps, new_head) {
            return false;
        }
        if snake.will_self_collide(dx, dy) {
            return false;
        }
        if grid.is_inside(new_head) {
            grid.get_safe(new_head) <= max_color
        } else {
            true
        }
    }

    /// The shared search engine. `admissible`/`is_goal`/`heuristic`/`step_cost`
    /// let callers (including Tunnel's escape/return search) reuse the same
    /// arena, open-list and closed-set discipline with different rules.
    pub(crate) fn run_search<Admiss, Goal, Heuristic, StepCost>(
        &self,
        start: &Snake,
        admissible: Admiss,
        is_goal: Goal,
        heuristic: Heuristic,
        step_cost: StepCost,
    ) -> SolverResult<Option<Vec<Snake>>>
    where
        Admiss: Fn(&Snake, i32, i32) -> bool,
        Goal: Fn(&Snake) -> bool,
        Heuristic: Fn(&Snake) -> i32,
        StepCost: Fn(&Snake, i32, i32) -> i32,
    {
        let mut arena: Vec<SearchNode> = Vec::new();
        let mut open: Vec<usize> = Vec::new();
        // Keyed on expansion, not on generation: the open list may hold
        // several entries for the same snake, the cheapest expands first
        // and later duplicates are dropped when popped.
        let mut closed: AHashSet<Snake> = AHashSet::default();

        let start_h = heuristic(start);
        arena.push(SearchNode {
            snake: start.clone(),
            g_cost: 0,
            f_cost: start_h,
            parent: None,
        });
        open.push(0);

        while let Some(current_idx) = open.first().copied() {
            open.remove(0);

            if arena.len() > self.frontier_limit {
                return Err(SolverError::SearchExhausted {
                    limit: self.frontier_limit,
                });
            }

            let snake = arena[current_idx].snake.clone();
            if closed.contains(&snake) {
                continue;
            }
            closed.insert(snake.clone());

            if is_goal(&snake) {
                return Ok(Some(Self::reconstruct(&arena, current_idx)));
            }

            let g_cost = arena[current_idx].g_cost;
            for &(dx, dy) in NEIGHBOR_OFFSETS.iter() {
                if !admissible(&snake, dx, dy) {
                    continue;
                }
                let next = snake.stepped(dx, dy);
                if closed.contains(&next) {
                    continue;
                }
                let g = g_cost + step_cost(&snake, dx, dy);
                let h = heuristic(&next);
                let f = g + h;
                let node_idx = arena.len();
                arena.push(SearchNode {
                    snake: next,
                    g_cost: g,
                    f_cost: f,
                    parent: Some(current_idx),
                });
                let pos = open.partition_point(|&idx| arena[idx].f_cost <= f);
                open.insert(pos, node_idx);
            }
        }

        Ok(None)
    }

    fn reconstruct(arena: &[SearchNode], mut idx: usize) -> Vec<Snake> {
        let mut path = Vec::new();
        loop {
            path.push(arena[idx].snake.clone());
            match arena[idx].parent {
                Some(parent) => idx = parent,
                None => break,
            }
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snake::Snake;

    fn two_cell_snake(x: i32, y: i32) -> Snake {
        Snake::of_points(vec![Pos::new(x, y), Pos::new(x - 1, y)]).unwrap()
    }

    fn limits() -> SolverLimits {
        SolverLimits::default()
    }

    fn limits_with_frontier(max_frontier_size: usize) -> SolverLimits {
        SolverLimits {
            max_frontier_size,
            ..SolverLimits::default()
        }
    }

    #[test]
    fn start_already_at_target_returns_single_state() {
        let grid = Grid::new(3, 3);
        let pf = Pathfinder::new(&grid, &limits());
        let start = two_cell_snake(0, 0);
        let result = pf.find_path_to_cell(&start, Pos::new(0, 0), 0).unwrap();
        assert_eq!(result, Some(vec![start]));
    }

    #[test]
    fn finds_straight_line_route() {
        let grid = Grid::new(5, 5);
        let pf = Pathfinder::new(&grid, &limits());
        let start = two_cell_snake(0, 0);
        let path = pf
            .find_path_to_cell(&start, Pos::new(3, 0), 0)
            .unwrap()
            .unwrap();
        // goal-to-start order, including start.
        assert_eq!(path.first().unwrap().head(), Pos::new(3, 0));
        assert_eq!(path.last().unwrap(), &start);
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn blocked_destination_yields_no_path() {
        let mut grid = Grid::new(1, 1);
        grid.set(Pos::new(0, 0), 5).unwrap();
        let pf = Pathfinder::new(&grid, &limits());
        // A single blocked cell with nowhere else to go and max_color 0
        // (EMPTY-only): the head can never land there.
        let start = Snake::of_points(vec![Pos::new(-1, 0), Pos::new(-2, 0)]).unwrap();
        let result = pf.find_path_to_cell(&start, Pos::new(0, 0), 0).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn max_color_permits_traversal_up_to_ceiling() {
        let mut grid = Grid::new(3, 1);
        grid.set(Pos::new(1, 0), 2).unwrap();
        let pf = Pathfinder::new(&grid, &limits());
        let start = Snake::of_points(vec![Pos::new(-1, 0), Pos::new(-2, 0)]).unwrap();
        let path = pf
            .find_path_to_cell(&start, Pos::new(2, 0), 2)
            .unwrap()
            .unwrap();
        assert_eq!(path.first().unwrap().head(), Pos::new(2, 0));
    }

    #[test]
    fn finds_path_to_nearest_of_several_targets() {
        let grid = Grid::new(5, 5);
        let pf = Pathfinder::new(&grid, &limits());
        let start = two_cell_snake(0, 0);
        let targets: AHashSet<Pos> = [Pos::new(4, 0), Pos::new(2, 0)].into_iter().collect();
        let path = pf
            .find_path_to_any_cell(&start, &targets, 0)
            .unwrap()
            .unwrap();
        assert_eq!(path.first().unwrap().head(), Pos::new(2, 0));
    }

    #[test]
    fn search_exhausted_is_fatal() {
        let grid = Grid::new(50, 50);
        let pf = Pathfinder::new(&grid, &limits_with_frontier(3));
        let start = two_cell_snake(0, 0);
        let err = pf.find_path_to_cell(&start, Pos::new(40, 40), 0).unwrap_err();
        assert!(matches!(err, SolverError::SearchExhausted { .. }));
    }

    #[test]
    fn pose_already_matching_returns_single_state() {
        let grid = Grid::new(5, 5);
        let pf = Pathfinder::new(&grid, &limits());
        let start = two_cell_snake(1, 1);
        let result = pf.find_path_to_pose(&start, &start, 0).unwrap();
        assert_eq!(result, Some(vec![start]));
    }

    #[test]
    fn pose_matching_reshapes_body_to_target_configuration() {
        let grid = Grid::new(9, 9);
        let pf = Pathfinder::new(&grid, &limits());
        let start = two_cell_snake(0, 0);
        let target =
            Snake::of_points(vec![Pos::new(4, 4), Pos::new(4, 3)]).unwrap();
        let route = pf
            .find_path_to_pose(&start, &target, 0)
            .unwrap()
            .expect("expected a route");

        assert_eq!(route.first().unwrap(), &start);
        assert_eq!(route.last().unwrap(), &target);
        for w in route.windows(2) {
            assert_eq!(w[0].head().manhattan_distance(w[1].head()), 1);
        }
    }

    /// The only route from `start` to `target.head()` is a corridor that
    /// exits through `target.segment(3)` -- a segment past the forbidden
    /// prefix (`target.segment(1)` and `target.segment(2)` sit off to the
    /// side, unreached by this route). Forbidding the *entire* remaining
    /// body would block that exit cell too and wrongly report no path;
    /// forbidding only the short prefix lets the head cross it.
    #[test]
    fn pose_matching_crosses_distal_segment_outside_forbidden_prefix() {
        let mut grid = Grid::new(35, 25);
        for x in 5..=19 {
            for y in 10..=21 {
                if y == 15 {
                    continue;
                }
                grid.set(Pos::new(x, y), 5).unwrap();
            }
        }
        let pf = Pathfinder::new(&grid, &limits());

        let start = Snake::of_points(vec![
            Pos::new(10, 15),
            Pos::new(9, 15),
            Pos::new(8, 15),
            Pos::new(7, 15),
        ])
        .unwrap();
        let target = Snake::of_points(vec![
            Pos::new(22, 16),
            Pos::new(21, 16),
            Pos::new(21, 15),
            Pos::new(20, 15),
        ])
        .unwrap();

        let route = pf
            .find_path_to_pose(&start, &target, 0)
            .unwrap()
            .expect("the distal segment is open ground, so a route exists");

        assert_eq!(route.first().unwrap(), &start);
        assert_eq!(route.last().unwrap(), &target);
        // The trailing `target.len() - 1` states are the mechanical
        // body-assembly steps appended after the head-route search, which
        // visit every target segment as a matter of course; the head-route
        // portion is what actually had to cross the forbidden-or-not
        // distal segment to get there.
        let head_route_len = route.len() - (target.len() - 1);
        assert!(
            route[..head_route_len]
                .iter()
                .any(|s| s.head() == target.segment(3)),
            "head-route search should cross the distal segment, the corridor's only exit"
        );
        for w in route.windows(2) {
            assert_eq!(w[0].head().manhattan_distance(w[1].head()), 1);
        }
    }

    #[test]
    fn pose_matching_unreachable_target_color_is_no_path() {
        let mut grid = Grid::new(9, 9);
        for y in 0..9 {
            grid.set(Pos::new(4, y), 5).unwrap();
        }
        let pf = Pathfinder::new(&grid, &limits());
        let start = two_cell_snake(0, 4);
        let target = Snake::of_points(vec![Pos::new(8, 4), Pos::new(7, 4)]).unwrap();
        // A solid column of color-5 cells splits the bounded search region
        // in two; with max_color 0 (EMPTY-only) the head can never cross it.
        assert_eq!(pf.find_path_to_pose(&start, &target, 0).unwrap(), None);
    }
}
