//! Local search and self-play.

use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

use abalone_core::board::{Board, DEFAULT_CLOCK_MS};
use abalone_core::color::Color;
use abalone_core::distributed::{LocalCoordinator, spawn_engine};
use abalone_core::moves::Move;
use abalone_core::options::EngineOptions;
use abalone_core::player::{Player, Turn};
use abalone_core::search::SearchProgress;
use abalone_core::search::search_result::SearchResult;
use colored::Colorize;

use crate::ui;

fn show_progress(coordinator: &mut LocalCoordinator) {
    coordinator.set_callback(Some(Arc::new(|progress: SearchProgress<Move>| {
        ui::print_progress(&progress);
    })));
}

/// Searches `board` once with a local cluster and prints the outcome.
pub fn search(
    board: &Board,
    options: &EngineOptions,
    budget: Option<std::time::Duration>,
) -> Result<(), Box<dyn Error>> {
    let (mut coordinator, cluster) = spawn_engine(options)?;
    show_progress(&mut coordinator);
    ui::print_board(board);
    println!(
        "Searching with {} workers ({})",
        cluster.len(),
        options.strategy
    );

    let start = Instant::now();
    let result = coordinator.search(board, budget);
    let elapsed = start.elapsed();
    ui::print_result(&result, coordinator.last_round(), elapsed);

    coordinator.shutdown();
    cluster.join();
    Ok(())
}

/// Plays a game between two engines with separate worker pools.
pub fn selfplay(options: &EngineOptions, clock_ms: i32) -> Result<(), Box<dyn Error>> {
    let clock_ms = if clock_ms > 0 { clock_ms } else { DEFAULT_CLOCK_MS };
    let mut board = Board::new();
    board.set_clocks(clock_ms, clock_ms);

    let (coordinator, one_cluster) = spawn_engine(options)?;
    let mut one = Player::new(Color::One, coordinator, options.move_time, clock_ms)
        .with_change_eval(options.change_eval)
        .with_max_moves(options.max_moves);
    let (coordinator, two_cluster) = spawn_engine(options)?;
    let mut two = Player::new(Color::Two, coordinator, options.move_time, clock_ms)
        .with_change_eval(options.change_eval)
        .with_max_moves(options.max_moves);

    ui::print_board(&board);
    loop {
        let turn = match board.side_to_move() {
            Color::One => one.on_position(&board),
            Color::Two => two.on_position(&board),
        };
        match turn {
            Turn::Played {
                mv,
                board: next,
                result,
            } => {
                print_move(board.side_to_move(), mv, &result);
                board = next;
                ui::print_board(&board);
            }
            Turn::GameOver(status) => {
                println!("{}", status.to_string().bold());
                break;
            }
            Turn::MoveLimit => {
                println!("Move limit reached");
                break;
            }
            Turn::NoMove(_) => {
                println!("{} has no move", board.side_to_move());
                break;
            }
            Turn::NotOurTurn => break,
        }
    }

    one.finish();
    two.finish();
    one_cluster.join();
    two_cluster.join();
    Ok(())
}

fn print_move(color: Color, mv: Move, result: &SearchResult<Move>) {
    let text = format!("{color} plays {mv}");
    let text = match color {
        Color::One => text.bright_yellow(),
        Color::Two => text.bright_green(),
    };
    println!("{text}  (score {}, depth {})", result.score, result.depth);
}
