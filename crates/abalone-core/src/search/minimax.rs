//! Plain negamax search without pruning.

use std::sync::Arc;

use crate::eval::Evaluator;
use crate::search::search_context::SearchContext;
use crate::search::search_result::SearchResult;
use crate::search::{
    Cancelled, Position, SearchControl, SearchParams, SearchProgressCallback, SearchStrategy,
};
use crate::types::{Depth, SCORE_INF, Score};

/// Exhaustive negamax to the depth limit. The window in [`SearchParams`] is
/// ignored.
pub struct Minimax<M> {
    callback: Option<Arc<SearchProgressCallback<M>>>,
}

impl<M> Default for Minimax<M> {
    fn default() -> Self {
        Minimax { callback: None }
    }
}

impl<M> Minimax<M> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: Position> SearchStrategy<P> for Minimax<P::Move> {
    fn name(&self) -> &'static str {
        "minimax"
    }

    fn search(
        &mut self,
        pos: &mut P,
        eval: &dyn Evaluator<P>,
        params: &SearchParams,
        control: &mut dyn SearchControl,
    ) -> Result<SearchResult<P::Move>, Cancelled> {
        let mut ctx = SearchContext::new(eval, control, params, self.callback.clone());
        let score = negamax(&mut ctx, pos, params.starting_depth)?;
        Ok(ctx.into_result(score))
    }

    fn set_callback(&mut self, callback: Option<Arc<SearchProgressCallback<P::Move>>>) {
        self.callback = callback;
    }
}

fn negamax<P: Position>(
    ctx: &mut SearchContext<'_, P>,
    pos: &mut P,
    depth: Depth,
) -> Result<Score, Cancelled> {
    ctx.visit()?;
    if ctx.is_leaf(pos, depth) {
        return Ok(ctx.evaluate(pos));
    }
    let mut moves = pos.generate_moves();
    if moves.is_empty() {
        return Ok(ctx.evaluate(pos));
    }

    let mut best = -SCORE_INF;
    while let Some(mv) = moves.next_move() {
        if !pos.play_move(mv) {
            pos.take_back();
            continue;
        }
        let result = negamax(ctx, pos, depth + 1);
        pos.take_back();
        let score = -result?;
        if score > best {
            best = score;
            ctx.improve(depth, mv, score);
        }
    }
    Ok(best)
}
