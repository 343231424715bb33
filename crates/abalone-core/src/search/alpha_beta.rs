//! Fail-soft alpha-beta search with optional move ordering and sampling.

use std::sync::Arc;

use crate::eval::Evaluator;
use crate::moves::MoveList;
use crate::search::sampling::{SamplingPolicy, sort_by_static_eval};
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::{
    Cancelled, Position, SearchControl, SearchParams, SearchProgressCallback, SearchStrategy,
};
use crate::types::{Depth, SCORE_INF, Score};

/// Nodes with fewer plies left than this keep the generation order.
const MIN_ORDERING_DEPTH: Depth = 2;

/// How moves are arranged before they are searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOrdering {
    /// Generation order.
    Natural,
    /// Best one-ply static evaluation first.
    Sorted,
    /// Sorted, then restricted to the sample. Trades completeness for speed.
    Sampled(SamplingPolicy),
}

/// Alpha-beta negamax.
pub struct AlphaBeta<M> {
    ordering: MoveOrdering,
    callback: Option<Arc<SearchProgressCallback<M>>>,
}

impl<M> AlphaBeta<M> {
    pub fn new(ordering: MoveOrdering) -> Self {
        AlphaBeta {
            ordering,
            callback: None,
        }
    }

    pub fn ordering(&self) -> MoveOrdering {
        self.ordering
    }
}

impl<P: Position> SearchStrategy<P> for AlphaBeta<P::Move> {
    fn name(&self) -> &'static str {
        match self.ordering {
            MoveOrdering::Natural => "alphabeta",
            MoveOrdering::Sorted => "alphabeta-sorted",
            MoveOrdering::Sampled(_) => "sampled",
        }
    }

    fn search(
        &mut self,
        pos: &mut P,
        eval: &dyn Evaluator<P>,
        params: &SearchParams,
        control: &mut dyn SearchControl,
    ) -> Result<SearchResult<P::Move>, Cancelled> {
        let mut ctx = SearchContext::new(eval, control, params, self.callback.clone());
        let score = alpha_beta(
            &mut ctx,
            pos,
            params.starting_depth,
            params.alpha,
            params.beta,
            self.ordering,
        )?;
        Ok(ctx.into_result(score))
    }

    fn set_callback(&mut self, callback: Option<Arc<SearchProgressCallback<P::Move>>>) {
        self.callback = callback;
    }
}

fn alpha_beta<P: Position>(
    ctx: &mut SearchContext<'_, P>,
    pos: &mut P,
    depth: Depth,
    mut alpha: Score,
    beta: Score,
    ordering: MoveOrdering,
) -> Result<Score, Cancelled> {
    ctx.visit()?;
    if ctx.is_leaf(pos, depth) {
        return Ok(ctx.evaluate(pos));
    }
    let mut moves = pos.generate_moves();
    if moves.is_empty() {
        return Ok(ctx.evaluate(pos));
    }
    if ctx.remaining(depth) >= MIN_ORDERING_DEPTH {
        order_moves(ctx, pos, &mut moves, ordering);
    }

    let mut best = -SCORE_INF;
    while let Some(mv) = moves.next_move() {
        if !pos.play_move(mv) {
            pos.take_back();
            continue;
        }
        let result = alpha_beta(ctx, pos, depth + 1, -beta, -alpha, ordering);
        pos.take_back();
        let score = -result?;
        if score > best {
            best = score;
            ctx.improve(depth, mv, score);
            if score > alpha {
                alpha = score;
                if alpha >= beta {
                    break;
                }
            }
        }
    }
    Ok(best)
}

fn order_moves<P: Position>(
    ctx: &SearchContext<'_, P>,
    pos: &mut P,
    moves: &mut MoveList<P::Move>,
    ordering: MoveOrdering,
) {
    match ordering {
        MoveOrdering::Natural => {}
        MoveOrdering::Sorted => {
            sort_by_static_eval(pos, ctx.evaluator(), moves);
        }
        MoveOrdering::Sampled(policy) => policy.apply(pos, ctx.evaluator(), moves),
    }
}
