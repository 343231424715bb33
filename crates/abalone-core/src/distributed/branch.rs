//! Per-branch bookkeeping of a distributed round.
//!
//! A branch is the subtree below one first-ply move. Its children are the
//! second-ply replies, each searched by one job. Job scores are from the root
//! player's view and the opponent picks the reply, so the branch value is the
//! minimum over its jobs: the bound starts at `+SCORE_INF` and only ever
//! decreases.

use crate::types::{SCORE_INF, Score};

/// State of one first-ply move during a round.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchState<M> {
    first_move: M,
    bound: Score,
    children: u32,
    dispatched: u32,
    completed: u32,
    best_reply: Option<M>,
}

impl<M: Copy> BranchState<M> {
    /// Creates an open branch with `children` jobs.
    pub fn new(first_move: M, children: u32) -> Self {
        debug_assert!(children > 0);
        BranchState {
            first_move,
            bound: SCORE_INF,
            children,
            dispatched: 0,
            completed: 0,
            best_reply: None,
        }
    }

    /// Creates a branch without children, closed at `bound`.
    pub fn closed(first_move: M, bound: Score) -> Self {
        BranchState {
            first_move,
            bound,
            children: 0,
            dispatched: 0,
            completed: 0,
            best_reply: None,
        }
    }

    pub fn first_move(&self) -> M {
        self.first_move
    }

    /// Lowest job score seen so far.
    pub fn bound(&self) -> Score {
        self.bound
    }

    pub fn children(&self) -> u32 {
        self.children
    }

    /// Number of jobs shipped to workers, re-dispatches included.
    pub fn dispatched(&self) -> u32 {
        self.dispatched
    }

    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Reply that produced the current bound.
    pub fn best_reply(&self) -> Option<M> {
        self.best_reply
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.completed == self.children
    }

    /// Counts a job sent to a worker.
    pub fn mark_dispatched(&mut self) {
        self.dispatched += 1;
    }

    /// Folds in a job result.
    ///
    /// # Returns
    ///
    /// `true` if the result closed the branch.
    pub fn record(&mut self, score: Score, reply: M) -> bool {
        debug_assert!(!self.is_closed(), "result for a closed branch");
        self.completed += 1;
        if score < self.bound {
            self.bound = score;
            self.best_reply = Some(reply);
        }
        self.is_closed()
    }

    /// Counts a job dropped without dispatch because the branch can no
    /// longer beat the best closed branch.
    ///
    /// # Returns
    ///
    /// `true` if the skip closed the branch.
    pub fn skip(&mut self) -> bool {
        debug_assert!(!self.is_closed(), "skip on a closed branch");
        self.completed += 1;
        self.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_is_minimum_of_results() {
        let mut branch = BranchState::new('a', 3);
        assert_eq!(branch.bound(), SCORE_INF);
        assert!(!branch.record(7, 'x'));
        assert!(!branch.record(9, 'y'));
        assert_eq!(branch.bound(), 7);
        assert_eq!(branch.best_reply(), Some('x'));
        assert!(branch.record(-2, 'z'));
        assert_eq!(branch.bound(), -2);
        assert_eq!(branch.best_reply(), Some('z'));
        assert!(branch.is_closed());
    }

    #[test]
    fn test_skips_count_towards_closure() {
        let mut branch = BranchState::new('a', 2);
        branch.mark_dispatched();
        assert!(!branch.record(4, 'x'));
        assert!(branch.skip());
        assert_eq!(branch.dispatched(), 1);
        assert_eq!(branch.completed(), 2);
        assert_eq!(branch.bound(), 4);
    }

    #[test]
    fn test_childless_branch_is_closed() {
        let branch = BranchState::closed('a', -40);
        assert!(branch.is_closed());
        assert_eq!(branch.bound(), -40);
        assert_eq!(branch.best_reply(), None);
    }
}
