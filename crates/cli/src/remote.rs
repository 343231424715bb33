//! Coordinator and worker processes connected over TCP.

use std::error::Error;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

use abalone_core::board::Board;
use abalone_core::distributed::tcp::{TcpCoordinatorLink, TcpWorkerLink};
use abalone_core::distributed::{Coordinator, Worker};
use abalone_core::eval::SchemeEvaluator;
use abalone_core::moves::Move;
use abalone_core::options::EngineOptions;
use abalone_core::search::SearchProgress;
use log::info;

use crate::ui;

/// Waits for `options.n_workers` workers on `listen`, searches `board` and
/// shuts the workers down.
pub fn coordinate(
    listen: &str,
    board: &Board,
    options: &EngineOptions,
    budget: Option<Duration>,
) -> Result<(), Box<dyn Error>> {
    let listener = TcpListener::bind(listen)?;
    println!(
        "Waiting for {} workers on {}",
        options.n_workers,
        listener.local_addr()?
    );
    let link = TcpCoordinatorLink::accept(&listener, options.n_workers)?;
    info!("{} workers connected", options.n_workers);
    let mut coordinator: Coordinator<Board, _> = Coordinator::new(
        link,
        Box::new(SchemeEvaluator::new()),
        options.coordinator.clone(),
    );
    coordinator.set_callback(Some(Arc::new(|progress: SearchProgress<Move>| {
        ui::print_progress(&progress);
    })));

    ui::print_board(board);
    let start = Instant::now();
    let result = coordinator.search(board, budget);
    ui::print_result(&result, coordinator.last_round(), start.elapsed());
    coordinator.shutdown();
    Ok(())
}

/// Connects to a coordinator and searches jobs until told to stop.
pub fn serve(connect: &str, options: &EngineOptions) -> Result<(), Box<dyn Error>> {
    let link = TcpWorkerLink::connect(connect)?;
    info!("connected to {connect}, searching with {}", options.strategy);
    let worker = Worker::new(
        0,
        link,
        options.strategy.create::<Board>(options.sampling),
        Box::new(SchemeEvaluator::new()),
        options.worker,
    );
    let stats = worker.run()?;
    ui::print_worker_stats(&stats);
    Ok(())
}
