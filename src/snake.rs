//! A fixed-length sequence of occupied cells, head at the front.

use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use crate::error::{SolverError, SolverResult};
use crate::geometry::Pos;

/// `[head, s_1, ..., s_{N-1}]`. `N` is fixed for the lifetime of a solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    parts: VecDeque<Pos>,
}

impl Snake {
    /// Builds a snake from an explicit, head-first sequence of points.
    /// Fails with `SolverError::EmptySnake` if `points` is empty.
    pub fn of_points(points: Vec<Pos>) -> SolverResult<Self> {
        if points.is_empty() {
            return Err(SolverError::EmptySnake);
        }
        Ok(Self {
            parts: VecDeque::from(points),
        })
    }

    /// A length-`n` snake collapsed onto a single cell, used to seed tunnel
    /// escape search.
    pub fn of_single_point(p: Pos, n: usize) -> SolverResult<Self> {
        if n == 0 {
            return Err(SolverError::EmptySnake);
        }
        Ok(Self {
            parts: std::iter::repeat(p).take(n).collect(),
        })
    }

    pub fn head(&self) -> Pos {
        self.parts[0]
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn segment(&self, i: usize) -> Pos {
        self.parts[i]
    }

    pub fn segments(&self) -> impl Iterator<Item = Pos> + '_ {
        self.parts.iter().copied()
    }

    pub fn contains(&self, p: Pos) -> bool {
        self.parts.contains(&p)
    }

    /// True iff a step by `(dx, dy)` would self-intersect: the new head would
    /// land on a segment other than the current tail, which vacates in the
    /// same tick.
    pub fn will_self_collide(&self, dx: i32, dy: i32) -> bool {
        let new_head = self.head().offset(dx, dy);
        self.parts
            .iter()
            .take(self.parts.len().saturating_sub(1))
            .any(|&seg| seg == new_head)
    }

    /// Steps the head by `(dx, dy)`: the tail cell disappears and every
    /// other segment shifts toward the head by one.
    pub fn stepped(&self, dx: i32, dy: i32) -> Self {
        let mut parts = self.parts.clone();
        parts.pop_back();
        parts.push_front(self.head().offset(dx, dy));
        Self { parts }
    }
}

/// Snake equality is used as a closed-set key in A*/BFS; hash it by packing
/// each segment the same way `Pos` does.
impl Hash for Snake {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for p in &self.parts {
            p.hash(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_points_is_rejected() {
        assert!(matches!(
            Snake::of_points(vec![]),
            Err(SolverError::EmptySnake)
        ));
    }

    #[test]
    fn of_single_point_repeats_n_times() {
        let s = Snake::of_single_point(Pos::new(2, 2), 3).unwrap();
        assert_eq!(s.len(), 3);
        assert!((0..3).all(|i| s.segment(i) == Pos::new(2, 2)));
    }

    #[test]
    fn stepped_shifts_tail_off() {
        let s = Snake::of_points(vec![Pos::new(1, 1), Pos::new(0, 1), Pos::new(-1, 1)]).unwrap();
        let stepped = s.stepped(1, 0);
        assert_eq!(stepped.head(), Pos::new(2, 1));
        assert_eq!(stepped.segment(1), Pos::new(1, 1));
        assert_eq!(stepped.segment(2), Pos::new(0, 1));
        assert_eq!(stepped.len(), 3);
    }

    #[test]
    fn self_collision_ignores_current_tail() {
        // Head at (1,0), body wraps back so stepping left would land on tail.
        let s = Snake::of_points(vec![Pos::new(1, 0), Pos::new(1, 1), Pos::new(0, 1)]).unwrap();
        // Moving to (0, 0) does not touch any segment.
        assert!(!s.will_self_collide(-1, 0));
    }

    #[test]
    fn self_collision_detects_body_overlap() {
        let s = Snake::of_points(vec![
            Pos::new(1, 0),
            Pos::new(0, 0),
            Pos::new(0, 1),
            Pos::new(1, 1),
        ])
        .unwrap();
        // Stepping down from (1,0) to (1,1) hits a non-tail segment.
        assert!(s.will_self_collide(0, 1));
    }

    #[test]
    fn equality_is_value_based() {
        let a = Snake::of_points(vec![Pos::new(0, 0), Pos::new(-1, 0)]).unwrap();
        let b = Snake::of_points(vec![Pos::new(0, 0), Pos::new(-1, 0)]).unwrap();
        assert_eq!(a, b);
    }
}
