//! Static evaluation.
//!
//! Scores are side-relative: a positive value favors the side to move. The
//! search negates child scores on the way up, so every evaluator has to keep
//! this convention.

use rand::seq::IteratorRandom;

use crate::board::{Board, Slot};
use crate::cell::{Cell, Direction};
use crate::types::{MAX_EVAL, Score, WIN_SCORE};

/// Static evaluation of positions of type `P`.
pub trait Evaluator<P>: Send + Sync {
    /// Scores `pos` from the point of view of the side to move.
    fn calc_evaluation(&self, pos: &P) -> Score;

    /// Switches to another weighting scheme between moves.
    fn change_evaluation(&mut self) {}

    /// Index of the active weighting scheme.
    fn scheme(&self) -> u8 {
        0
    }

    /// Selects a weighting scheme by index; out-of-range indices are clamped.
    fn set_scheme(&mut self, _scheme: u8) {}
}

/// Weights of one evaluation scheme.
#[derive(Debug, Clone, Copy)]
pub struct EvalScheme {
    pub name: &'static str,
    /// Value of one marble.
    pub marble: Score,
    /// Bonus per marble by distance from the center, ring 0 to ring 4.
    pub ring: [Score; 5],
    /// Bonus per friendly neighbor of a marble.
    pub cohesion: Score,
}

/// Built-in schemes; index 0 is the default.
pub const EVAL_SCHEMES: [EvalScheme; 3] = [
    EvalScheme {
        name: "balanced",
        marble: 1_000,
        ring: [60, 40, 20, 0, -30],
        cohesion: 6,
    },
    EvalScheme {
        name: "center",
        marble: 1_000,
        ring: [100, 70, 35, 0, -60],
        cohesion: 3,
    },
    EvalScheme {
        name: "compact",
        marble: 1_000,
        ring: [40, 30, 15, 0, -20],
        cohesion: 12,
    },
];

/// Abalone evaluator built from [`EVAL_SCHEMES`].
#[derive(Debug, Clone, Default)]
pub struct SchemeEvaluator {
    scheme: usize,
}

impl SchemeEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an evaluator using scheme `index`, clamped to the table.
    pub fn with_scheme(index: u8) -> Self {
        SchemeEvaluator {
            scheme: (index as usize).min(EVAL_SCHEMES.len() - 1),
        }
    }

    /// Returns the weights in use.
    pub fn weights(&self) -> &'static EvalScheme {
        &EVAL_SCHEMES[self.scheme]
    }
}

impl Evaluator<Board> for SchemeEvaluator {
    fn calc_evaluation(&self, board: &Board) -> Score {
        let me = board.side_to_move();
        let opp = me.opposite();
        if !board.is_valid() {
            return if board.marbles(me) <= board.marbles(opp) {
                -WIN_SCORE
            } else {
                WIN_SCORE
            };
        }

        let w = self.weights();
        let mut score = 0;
        for cell in Cell::playable() {
            let Slot::Marble(color) = board.slot(cell) else {
                continue;
            };
            let friends = Direction::ALL
                .iter()
                .filter(|&&d| board.slot(cell.step(d)) == Slot::Marble(color))
                .count() as Score;
            let value = w.marble + w.ring[cell.ring()] + w.cohesion * friends;
            score += if color == me { value } else { -value };
        }
        score.clamp(-MAX_EVAL, MAX_EVAL)
    }

    fn change_evaluation(&mut self) {
        let mut rng = rand::rng();
        if let Some(pick) = (0..EVAL_SCHEMES.len())
            .filter(|&i| i != self.scheme)
            .choose(&mut rng)
        {
            self.scheme = pick;
        }
    }

    fn scheme(&self) -> u8 {
        self.scheme as u8
    }

    fn set_scheme(&mut self, scheme: u8) {
        *self = SchemeEvaluator::with_scheme(scheme);
    }
}
