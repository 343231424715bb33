//! Scalar types and score bounds shared by the board, evaluator and search.

/// Search depth measured in plies from the root.
pub type Depth = u32;

/// Side-relative evaluation score.
pub type Score = i32;

/// Bound that no evaluation ever reaches; used to seed windows.
pub const SCORE_INF: Score = 1_000_000;

/// Largest magnitude a static evaluation may return.
pub const MAX_EVAL: Score = 99_999;

/// Score assigned to a decided game from the winner's point of view.
pub const WIN_SCORE: Score = 90_000;
