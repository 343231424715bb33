//! Shallow move ordering and top-K sampling.

use crate::eval::Evaluator;
use crate::moves::MoveList;
use crate::search::Position;
use crate::types::{SCORE_INF, Score};

/// Keeps the best `samples` moves plus every move whose one-ply score is
/// within `threshold` of the best one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPolicy {
    pub samples: usize,
    pub threshold: Score,
}

impl Default for SamplingPolicy {
    fn default() -> Self {
        SamplingPolicy {
            samples: 16,
            threshold: 50,
        }
    }
}

impl SamplingPolicy {
    #[must_use]
    pub fn new(samples: usize, threshold: Score) -> Self {
        SamplingPolicy { samples, threshold }
    }

    /// Number of leading moves to keep given keys sorted best first.
    ///
    /// # Arguments
    ///
    /// * `sorted_keys` - Ascending keys as returned by [`sort_by_static_eval`]
    pub fn keep_count(&self, sorted_keys: &[Score]) -> usize {
        let Some(&best) = sorted_keys.first() else {
            return 0;
        };
        let within = sorted_keys
            .iter()
            .take_while(|&&key| key <= best.saturating_add(self.threshold))
            .count();
        within.max(self.samples).min(sorted_keys.len())
    }

    /// Sorts `moves` best first and drops the ones outside the sample.
    pub fn apply<P: Position>(
        &self,
        pos: &mut P,
        eval: &dyn Evaluator<P>,
        moves: &mut MoveList<P::Move>,
    ) {
        let keys = sort_by_static_eval(pos, eval, moves);
        moves.truncate(self.keep_count(&keys));
    }
}

/// Sorts `moves` by the static evaluation of the resulting positions, best
/// move for the side to move first. The sort is stable.
///
/// # Returns
///
/// The sort keys in the new move order. A key is the opponent's score after
/// the move, so lower keys are better.
pub fn sort_by_static_eval<P: Position>(
    pos: &mut P,
    eval: &dyn Evaluator<P>,
    moves: &mut MoveList<P::Move>,
) -> Vec<Score> {
    let mut keys: Vec<Score> = moves
        .iter()
        .map(|&mv| {
            let key = if pos.play_move(mv) {
                eval.calc_evaluation(pos)
            } else {
                SCORE_INF
            };
            pos.take_back();
            key
        })
        .collect();
    moves.sort_by_keys(&keys);
    keys.sort_unstable();
    keys
}
