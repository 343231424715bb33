//! Game tree search.
//!
//! Search operates on any [`Position`] through an [`Evaluator`], using the
//! negamax convention: every score is relative to the side to move at the
//! node that produced it, and callers negate child scores. Long searches poll
//! a [`SearchControl`] every few nodes and unwind with [`Cancelled`] when told
//! to stop; the position is restored on the way out.

pub mod alpha_beta;
pub mod minimax;
pub mod sampling;
pub mod search_context;
pub mod search_result;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::error::Error;
use crate::eval::Evaluator;
use crate::moves::MoveList;
use crate::search::alpha_beta::{AlphaBeta, MoveOrdering};
use crate::search::minimax::Minimax;
use crate::search::sampling::SamplingPolicy;
use crate::search::search_result::SearchResult;
use crate::types::{Depth, SCORE_INF, Score};

/// Default number of node expansions between two cancellation polls.
pub const DEFAULT_POLL_INTERVAL: u32 = 4;

/// What the search needs from a game position.
///
/// Positions are mutated in place. Every [`Position::play_move`] call, whether
/// or not it applied the move, is paired with exactly one
/// [`Position::take_back`].
pub trait Position {
    /// Move type; `Default` is the "no move" sentinel.
    type Move: Copy + PartialEq + fmt::Debug + Default + Send + Sync + 'static;

    /// Generates all legal moves for the side to move.
    fn generate_moves(&self) -> MoveList<Self::Move>;

    /// Applies a move, returning `false` if it was ignored.
    fn play_move(&mut self, mv: Self::Move) -> bool;

    /// Reverts the last [`Position::play_move`]; `false` if nothing to revert.
    fn take_back(&mut self) -> bool;

    /// Cheap check that the game is still running.
    fn is_valid(&self) -> bool;
}

/// Returned through every recursion level when a search is stopped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("search cancelled after {n_nodes} nodes")]
pub struct Cancelled {
    /// Nodes visited before the stop.
    pub n_nodes: u64,
}

/// Cooperative cancellation hook polled during search.
pub trait SearchControl {
    /// Returns true when the search must unwind.
    fn should_stop(&mut self) -> bool;
}

/// Control that never stops a search.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStop;

impl SearchControl for NeverStop {
    fn should_stop(&mut self) -> bool {
        false
    }
}

/// Control that stops a search once a wall-clock deadline passes.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn at(at: Instant) -> Self {
        Deadline { at }
    }

    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Deadline {
            at: Instant::now() + budget,
        }
    }
}

impl SearchControl for Deadline {
    fn should_stop(&mut self) -> bool {
        Instant::now() >= self.at
    }
}

/// Shared abort flag; clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl SearchControl for AbortFlag {
    fn should_stop(&mut self) -> bool {
        self.is_aborted()
    }
}

/// Depth limits and window of one search invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Nodes at this depth are evaluated statically.
    pub max_depth: Depth,
    /// Depth of the position handed to the search. Distributed workers start
    /// at depth 2 because the first two plies were played by the coordinator.
    pub starting_depth: Depth,
    pub alpha: Score,
    pub beta: Score,
    /// Node expansions between two cancellation polls; `0` never polls.
    pub poll_interval: u32,
}

impl SearchParams {
    /// Full-window search from the root to `max_depth`.
    #[must_use]
    pub fn new(max_depth: Depth) -> Self {
        SearchParams {
            max_depth,
            starting_depth: 0,
            alpha: -SCORE_INF,
            beta: SCORE_INF,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_starting_depth(mut self, starting_depth: Depth) -> Self {
        self.starting_depth = starting_depth;
        self
    }

    #[must_use]
    pub fn with_window(mut self, alpha: Score, beta: Score) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: u32) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

/// Progress information reported when a better root move is found.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchProgress<M> {
    pub depth: Depth,
    pub score: Score,
    pub best_move: M,
    pub nodes: u64,
}

/// Type alias for search progress callback.
pub type SearchProgressCallback<M> = dyn Fn(SearchProgress<M>) + Send + Sync + 'static;

/// A search algorithm.
pub trait SearchStrategy<P: Position>: Send {
    fn name(&self) -> &'static str;

    /// Searches `pos` and returns the best move with its score.
    ///
    /// # Arguments
    ///
    /// * `pos` - Position to search; restored before returning
    /// * `eval` - Static evaluator used at the leaves
    /// * `params` - Depth limits and window
    /// * `control` - Cancellation hook polled every `params.poll_interval` nodes
    ///
    /// # Errors
    ///
    /// Returns [`Cancelled`] when `control` asked to stop.
    fn search(
        &mut self,
        pos: &mut P,
        eval: &dyn Evaluator<P>,
        params: &SearchParams,
        control: &mut dyn SearchControl,
    ) -> Result<SearchResult<P::Move>, Cancelled>;

    /// Installs the callback fired on every new best move at the starting depth.
    fn set_callback(&mut self, callback: Option<Arc<SearchProgressCallback<P::Move>>>);
}

/// Available strategies, in listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    Minimax,
    AlphaBeta,
    #[default]
    AlphaBetaSorted,
    Sampled,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::Minimax,
        StrategyKind::AlphaBeta,
        StrategyKind::AlphaBetaSorted,
        StrategyKind::Sampled,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Minimax => "minimax",
            StrategyKind::AlphaBeta => "alphabeta",
            StrategyKind::AlphaBetaSorted => "alphabeta-sorted",
            StrategyKind::Sampled => "sampled",
        }
    }

    /// Looks up a strategy by its listing index.
    pub fn from_index(index: usize) -> Option<StrategyKind> {
        Self::ALL.get(index).copied()
    }

    /// Instantiates the strategy.
    ///
    /// # Arguments
    ///
    /// * `sampling` - Policy used by [`StrategyKind::Sampled`]; ignored otherwise
    pub fn create<P: Position + 'static>(
        self,
        sampling: SamplingPolicy,
    ) -> Box<dyn SearchStrategy<P>> {
        match self {
            StrategyKind::Minimax => Box::new(Minimax::<P::Move>::new()),
            StrategyKind::AlphaBeta => Box::new(AlphaBeta::<P::Move>::new(MoveOrdering::Natural)),
            StrategyKind::AlphaBetaSorted => {
                Box::new(AlphaBeta::<P::Move>::new(MoveOrdering::Sorted))
            }
            StrategyKind::Sampled => {
                Box::new(AlphaBeta::<P::Move>::new(MoveOrdering::Sampled(sampling)))
            }
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    /// Accepts a strategy name or its listing index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(index) = s.parse::<usize>() {
            return StrategyKind::from_index(index)
                .ok_or_else(|| Error::Config(format!("no strategy with index {index}")));
        }
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown strategy '{s}'")))
    }
}
