//! Search result types.

use crate::types::{Depth, Score};

/// Result of a search operation.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult<M> {
    /// Best move at the starting depth; `None` when the position had no
    /// legal move or was already decided.
    pub best_move: Option<M>,
    pub score: Score,
    pub depth: Depth,
    pub n_nodes: u64,
    /// Principal variation as far as it is known, best move first.
    pub pv_line: Vec<M>,
}

impl<M: Copy> SearchResult<M> {
    /// Creates a result carrying a best move.
    pub fn new(best_move: Option<M>, score: Score, depth: Depth, n_nodes: u64) -> Self {
        SearchResult {
            best_move,
            score,
            depth,
            n_nodes,
            pv_line: best_move.into_iter().collect(),
        }
    }

    /// Creates a result for a position without a move to play.
    pub fn no_move(score: Score, depth: Depth, n_nodes: u64) -> Self {
        Self::new(None, score, depth, n_nodes)
    }
}
