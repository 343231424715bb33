//! Game driver for one side.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::board::{Board, GameStatus};
use crate::color::Color;
use crate::distributed::coordinator::Coordinator;
use crate::distributed::transport::CoordinatorLink;
use crate::moves::Move;
use crate::search::search_result::SearchResult;
use crate::time_control::TimeManager;

/// What a player did with a received position.
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// The opponent is to move.
    NotOurTurn,
    /// A move was played; `board` is the position after it.
    Played {
        mv: Move,
        board: Board,
        result: SearchResult<Move>,
    },
    /// Our turn, but the search found nothing to play.
    NoMove(SearchResult<Move>),
    GameOver(GameStatus),
    /// The configured number of own moves has been played.
    MoveLimit,
}

/// Plays one color with a distributed search engine.
pub struct Player<L: CoordinatorLink> {
    color: Color,
    coordinator: Coordinator<Board, L>,
    time: TimeManager,
    change_eval: bool,
    moves_left: Option<u32>,
}

impl<L: CoordinatorLink> Player<L> {
    /// Creates a player.
    ///
    /// # Arguments
    ///
    /// * `color` - Side played
    /// * `coordinator` - Search engine
    /// * `move_time` - Base thinking time per move
    /// * `initial_clock_ms` - Game clock at the start
    pub fn new(
        color: Color,
        coordinator: Coordinator<Board, L>,
        move_time: Duration,
        initial_clock_ms: i32,
    ) -> Self {
        Player {
            color,
            coordinator,
            time: TimeManager::new(move_time, initial_clock_ms),
            change_eval: true,
            moves_left: None,
        }
    }

    #[must_use]
    pub fn with_change_eval(mut self, change_eval: bool) -> Self {
        self.change_eval = change_eval;
        self
    }

    #[must_use]
    pub fn with_max_moves(mut self, max_moves: Option<u32>) -> Self {
        self.moves_left = max_moves;
        self
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn moves_left(&self) -> Option<u32> {
        self.moves_left
    }

    pub fn coordinator_mut(&mut self) -> &mut Coordinator<Board, L> {
        &mut self.coordinator
    }

    /// Reacts to a position received from the game server.
    ///
    /// On our turn, searches within the time budget derived from our clock,
    /// plays the move charging the time spent and switches the evaluation
    /// scheme if enabled.
    pub fn on_position(&mut self, board: &Board) -> Turn {
        let status = board.valid_state();
        if status.is_over() {
            info!("game over: {status}");
            return Turn::GameOver(status);
        }
        if board.side_to_move() != self.color {
            return Turn::NotOurTurn;
        }
        if self.moves_left == Some(0) {
            return Turn::MoveLimit;
        }

        let budget = self.time.budget(board.clock_ms(self.color));
        let started = Instant::now();
        let result = self.coordinator.search(board, Some(budget));
        let Some(mv) = result.best_move else {
            warn!("{} has no move to play", self.color);
            return Turn::NoMove(result);
        };
        let elapsed = i32::try_from(started.elapsed().as_millis()).unwrap_or(i32::MAX);

        let mut next = board.clone();
        next.play_move_timed(mv, elapsed);
        if self.change_eval {
            self.coordinator.evaluator_mut().change_evaluation();
        }
        if let Some(left) = self.moves_left.as_mut() {
            *left = left.saturating_sub(1);
        }
        info!(
            "{} plays {mv} (score {}, depth {}, {elapsed} of {} ms)",
            self.color,
            result.score,
            result.depth,
            budget.as_millis()
        );
        Turn::Played {
            mv,
            board: next,
            result,
        }
    }

    /// Terminates the workers.
    ///
    /// # Returns
    ///
    /// The number of workers told to terminate.
    pub fn finish(&mut self) -> usize {
        self.coordinator.shutdown()
    }
}
