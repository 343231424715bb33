//! Terminal output.

use std::time::Duration;

use abalone_core::board::{Board, Slot};
use abalone_core::cell::Cell;
use abalone_core::color::Color;
use abalone_core::distributed::{RoundSummary, WorkerStats};
use abalone_core::moves::Move;
use abalone_core::search::SearchProgress;
use abalone_core::search::StrategyKind;
use abalone_core::search::search_result::SearchResult;
use colored::Colorize;
use num_format::{Locale, ToFormattedString};

/// Prints a colored representation of the board to the terminal.
pub fn print_board(board: &Board) {
    for r in -4..=4i32 {
        let row: Vec<Cell> = Cell::playable().filter(|c| c.r() == r).collect();
        let Some(first) = row.first() else {
            continue;
        };
        print!("{}{} ", " ".repeat(r.unsigned_abs() as usize), first.row_letter());
        for cell in &row {
            let symbol = match board.slot(*cell) {
                Slot::Marble(Color::One) => " O".bright_yellow(),
                Slot::Marble(Color::Two) => " X".bright_green(),
                _ => " ·".bright_black(),
            };
            print!("{symbol}");
        }

        match r {
            -3 => println!("      {}", side_label(board.side_to_move())),
            -2 => println!(
                "      O: {}",
                format!("{:2}", board.marbles(Color::One)).bright_yellow()
            ),
            -1 => println!(
                "      X: {}",
                format!("{:2}", board.marbles(Color::Two)).bright_green()
            ),
            0 => println!("      Move {}", board.move_no()),
            1 => println!(
                "      Clocks {:.1}s / {:.1}s",
                f64::from(board.clock_ms(Color::One)) / 1000.0,
                f64::from(board.clock_ms(Color::Two)) / 1000.0
            ),
            _ => println!(),
        }
    }
    let status = board.valid_state();
    if status.is_over() {
        println!("{}", status.to_string().bold());
    }
}

fn side_label(color: Color) -> colored::ColoredString {
    match color {
        Color::One => "O to move".bright_yellow(),
        Color::Two => "X to move".bright_green(),
    }
}

pub fn print_progress(progress: &SearchProgress<Move>) {
    println!(
        "  depth {:>2}  score {:>7}  {:<18} {:>12} nodes",
        progress.depth,
        progress.score,
        progress.best_move.to_string(),
        progress.nodes.to_formatted_string(&Locale::en)
    );
}

/// Prints the outcome of one search.
pub fn print_result(
    result: &SearchResult<Move>,
    summary: Option<RoundSummary>,
    elapsed: Duration,
) {
    let best = result
        .best_move
        .map_or_else(|| "(none)".to_string(), |mv| mv.to_string());
    let secs = elapsed.as_secs_f64();
    let nps = if secs > 0.0 {
        (result.n_nodes as f64 / secs) as u64
    } else {
        0
    };
    println!("{} {}", "Best move:".bold(), best.bright_cyan());
    println!("  Score:  {}", result.score);
    println!("  Depth:  {}", result.depth);
    println!("  Nodes:  {}", result.n_nodes.to_formatted_string(&Locale::en));
    println!("  Time:   {secs:.3}s ({} N/s)", nps.to_formatted_string(&Locale::en));
    if result.pv_line.len() > 1 {
        let pv: Vec<String> = result.pv_line.iter().map(Move::to_string).collect();
        println!("  PV:     {}", pv.join(" "));
    }
    if let Some(summary) = summary {
        let state = if summary.completed {
            "completed".green()
        } else {
            "abandoned".yellow()
        };
        println!(
            "  Last round: depth {} {state}, {} branches, {} jobs, {} skipped, {} reissued, {} cutoffs",
            summary.depth,
            summary.branches,
            summary.jobs,
            summary.skipped,
            summary.redispatched,
            summary.cutoffs
        );
    }
}

pub fn print_worker_stats(stats: &WorkerStats) {
    println!(
        "Worker done: {} jobs, {} cutoffs, {} aborted, {} nodes",
        stats.jobs,
        stats.cutoffs,
        stats.aborted,
        stats.n_nodes.to_formatted_string(&Locale::en)
    );
}

pub fn print_strategies() {
    println!("| {:^3} | {:<18} |", "#", "Strategy");
    println!("|-----|--------------------|");
    for (index, kind) in StrategyKind::ALL.iter().enumerate() {
        let marker = if *kind == StrategyKind::default() {
            " (default)"
        } else {
            ""
        };
        println!("| {index:^3} | {:<18} |{marker}", kind.name());
    }
}
