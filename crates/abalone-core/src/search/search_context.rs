//! Per-invocation search state shared by the strategies.

use std::sync::Arc;

use crate::eval::Evaluator;
use crate::search::search_result::SearchResult;
use crate::search::{
    Cancelled, Position, SearchControl, SearchParams, SearchProgress, SearchProgressCallback,
};
use crate::types::{Depth, SCORE_INF, Score};

/// Holds the evaluator, cancellation hook, node counter and the best root
/// move of one search invocation.
pub struct SearchContext<'a, P: Position> {
    eval: &'a dyn Evaluator<P>,
    control: &'a mut dyn SearchControl,
    pub params: SearchParams,
    /// Number of nodes visited.
    pub n_nodes: u64,
    callback: Option<Arc<SearchProgressCallback<P::Move>>>,
    best_move: Option<P::Move>,
    best_score: Score,
}

impl<'a, P: Position> SearchContext<'a, P> {
    pub fn new(
        eval: &'a dyn Evaluator<P>,
        control: &'a mut dyn SearchControl,
        params: &SearchParams,
        callback: Option<Arc<SearchProgressCallback<P::Move>>>,
    ) -> Self {
        SearchContext {
            eval,
            control,
            params: *params,
            n_nodes: 0,
            callback,
            best_move: None,
            best_score: -SCORE_INF,
        }
    }

    /// Counts a node expansion and polls the control hook every
    /// `poll_interval` nodes.
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when the hook asks to stop.
    #[inline]
    pub fn visit(&mut self) -> Result<(), Cancelled> {
        self.n_nodes += 1;
        let interval = u64::from(self.params.poll_interval);
        if interval > 0 && self.n_nodes % interval == 0 && self.control.should_stop() {
            return Err(Cancelled {
                n_nodes: self.n_nodes,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn evaluate(&self, pos: &P) -> Score {
        self.eval.calc_evaluation(pos)
    }

    pub fn evaluator(&self) -> &'a dyn Evaluator<P> {
        self.eval
    }

    /// Returns true if `pos` at `depth` is evaluated statically.
    #[inline]
    pub fn is_leaf(&self, pos: &P, depth: Depth) -> bool {
        depth >= self.params.max_depth || !pos.is_valid()
    }

    /// Number of plies left below `depth`.
    #[inline]
    pub fn remaining(&self, depth: Depth) -> Depth {
        self.params.max_depth.saturating_sub(depth)
    }

    /// Records an improved move. Only moves at the starting depth become the
    /// best move; each one is reported to the progress callback.
    #[inline]
    pub fn improve(&mut self, depth: Depth, mv: P::Move, score: Score) {
        if depth != self.params.starting_depth {
            return;
        }
        self.best_move = Some(mv);
        self.best_score = score;
        if let Some(callback) = &self.callback {
            callback(SearchProgress {
                depth: self.params.max_depth,
                score,
                best_move: mv,
                nodes: self.n_nodes,
            });
        }
    }

    /// Builds the result from the root score.
    pub fn into_result(self, score: Score) -> SearchResult<P::Move> {
        debug_assert!(self.best_move.is_none() || self.best_score == score);
        SearchResult::new(self.best_move, score, self.params.max_depth, self.n_nodes)
    }
}
