mod common;

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use abalone_core::board::Board;
use abalone_core::distributed::protocol::Message;
use abalone_core::distributed::tcp::{TcpCoordinatorLink, TcpWorkerLink};
use abalone_core::distributed::transport::{ChannelCoordinatorLink, WorkerLink, channel_links};
use abalone_core::distributed::{Coordinator, LocalCluster, Worker, WorkerStats};
use abalone_core::eval::{Evaluator, SchemeEvaluator};
use abalone_core::moves::Move;
use abalone_core::options::{CoordinatorOptions, WorkerOptions};
use abalone_core::search::alpha_beta::{AlphaBeta, MoveOrdering};
use abalone_core::search::search_result::SearchResult;
use abalone_core::search::{NeverStop, Position, SearchParams, SearchStrategy, StrategyKind};
use abalone_core::types::Depth;
use common::{Shape, Stall, TreeEval, TreeGame, TreeMove, one_ply_pick};

type TreeCoordinator = Coordinator<TreeGame, ChannelCoordinatorLink>;

fn sorted_strategy() -> Box<dyn SearchStrategy<TreeGame>> {
    Box::new(AlphaBeta::<TreeMove>::new(MoveOrdering::Sorted))
}

fn stall_strategy() -> Box<dyn SearchStrategy<TreeGame>> {
    Box::new(Stall)
}

fn tree_cluster(
    n_workers: usize,
    strategy: fn() -> Box<dyn SearchStrategy<TreeGame>>,
    options: CoordinatorOptions,
) -> (TreeCoordinator, LocalCluster) {
    let (link, cluster) = LocalCluster::spawn(n_workers, WorkerOptions::default(), |_| {
        (
            strategy(),
            Box::new(TreeEval) as Box<dyn Evaluator<TreeGame>>,
        )
    })
    .unwrap();
    (Coordinator::new(link, Box::new(TreeEval), options), cluster)
}

fn finish(mut coordinator: TreeCoordinator, cluster: LocalCluster) -> Vec<WorkerStats> {
    let n_workers = cluster.len();
    assert_eq!(coordinator.shutdown(), n_workers);
    let stats = cluster.join();
    assert_eq!(stats.len(), n_workers);
    stats
}

fn single_process(pos: &TreeGame, depth: Depth) -> SearchResult<TreeMove> {
    AlphaBeta::<TreeMove>::new(MoveOrdering::Natural)
        .search(
            &mut pos.clone(),
            &TreeEval,
            &SearchParams::new(depth),
            &mut NeverStop,
        )
        .unwrap()
}

#[test]
fn test_branch_takes_minimum_reply() {
    let options = CoordinatorOptions::default().with_depths(2, 2);
    let (mut coordinator, cluster) = tree_cluster(1, sorted_strategy, options);
    let result = coordinator.search(&TreeGame::new(Shape::SingleBranch), None);

    assert_eq!(result.best_move, Some(TreeMove(1)));
    assert_eq!(result.score, -3);
    assert_eq!(result.depth, 2);
    assert_eq!(result.pv_line, vec![TreeMove(1), TreeMove(2)]);
    let summary = coordinator.last_round().unwrap();
    assert!(summary.completed);
    assert_eq!(summary.jobs, 2);
    assert_eq!(summary.skipped, 0);
    finish(coordinator, cluster);
}

#[test]
fn test_refuted_branch_is_not_fully_dispatched() {
    let options = CoordinatorOptions::default().with_depths(2, 2);
    let (mut coordinator, cluster) = tree_cluster(1, sorted_strategy, options);
    let result = coordinator.search(&TreeGame::new(Shape::TwoBranches), None);

    assert_eq!(result.best_move, Some(TreeMove(1)));
    assert_eq!(result.score, 4);
    let summary = coordinator.last_round().unwrap();
    assert_eq!(summary.branches, 2);
    assert_eq!(summary.jobs, 6);
    assert_eq!(summary.skipped, 2);

    let stats = finish(coordinator, cluster);
    let jobs: u64 = stats.iter().map(|s| s.jobs).sum();
    assert_eq!(jobs, 4);
}

#[test]
fn test_one_worker_matches_single_process() {
    for seed in 0..6 {
        for depth in 2..=4 {
            let options = CoordinatorOptions::default().with_depths(2, depth);
            let (mut coordinator, cluster) = tree_cluster(1, sorted_strategy, options);
            let pos = TreeGame::random(seed, 4);
            let result = coordinator.search(&pos, None);
            let expected = single_process(&pos, depth);

            assert_eq!(result.depth, depth);
            assert_eq!(result.best_move, expected.best_move, "seed {seed} depth {depth}");
            assert_eq!(result.score, expected.score, "seed {seed} depth {depth}");
            finish(coordinator, cluster);
        }
    }
}

#[test]
fn test_many_workers_match_single_process_score() {
    for seed in 0..6 {
        for depth in 2..=4 {
            let options = CoordinatorOptions::default().with_depths(2, depth);
            let (mut coordinator, cluster) = tree_cluster(4, sorted_strategy, options);
            let pos = TreeGame::random(seed, 5);
            let result = coordinator.search(&pos, None);
            let expected = single_process(&pos, depth);

            assert_eq!(result.score, expected.score, "seed {seed} depth {depth}");
            assert!(pos.generate_moves().contains(&result.best_move.unwrap()));
            finish(coordinator, cluster);
        }
    }
}

#[test]
fn test_without_bound_updates_score_is_unchanged() {
    let options = CoordinatorOptions::default()
        .with_depths(2, 3)
        .with_bound_updates(false);
    let (mut coordinator, cluster) = tree_cluster(3, sorted_strategy, options);
    let pos = TreeGame::random(7, 5);
    let result = coordinator.search(&pos, None);
    assert_eq!(result.score, single_process(&pos, 3).score);
    finish(coordinator, cluster);
}

#[test]
fn test_board_matches_single_process() {
    let factory = |_: usize| {
        (
            StrategyKind::AlphaBetaSorted.create::<Board>(Default::default()),
            Box::new(SchemeEvaluator::new()) as Box<dyn Evaluator<Board>>,
        )
    };
    let board = Board::new();
    let expected = AlphaBeta::<Move>::new(MoveOrdering::Natural)
        .search(
            &mut board.clone(),
            &SchemeEvaluator::new(),
            &SearchParams::new(2),
            &mut NeverStop,
        )
        .unwrap();

    let (link, cluster) = LocalCluster::spawn(1, WorkerOptions::default(), factory).unwrap();
    let mut coordinator: Coordinator<Board, _> = Coordinator::new(
        link,
        Box::new(SchemeEvaluator::new()),
        CoordinatorOptions::default().with_depths(2, 2),
    );
    let result = coordinator.search(&board, None);
    assert_eq!(result.best_move, expected.best_move);
    assert_eq!(result.score, expected.score);
    assert_eq!(coordinator.shutdown(), 1);
    cluster.join();

    let (link, cluster) = LocalCluster::spawn(3, WorkerOptions::default(), factory).unwrap();
    let mut coordinator: Coordinator<Board, _> = Coordinator::new(
        link,
        Box::new(SchemeEvaluator::new()),
        CoordinatorOptions::default().with_depths(2, 2),
    );
    let result = coordinator.search(&board, None);
    assert_eq!(result.score, expected.score);
    assert_eq!(coordinator.shutdown(), 3);
    cluster.join();
}

#[test]
fn test_timeout_keeps_previous_round() {
    let options = CoordinatorOptions::default()
        .with_depths(2, 3)
        .with_lease_timeout(None);
    let (mut coordinator, cluster) = tree_cluster(2, stall_strategy, options);
    let pos = TreeGame::random(11, 4);
    let (expected_move, expected_score) = one_ply_pick(&pos);

    let result = coordinator.search(&pos, Some(Duration::from_millis(100)));
    assert_eq!(result.depth, 1);
    assert_eq!(result.best_move, Some(expected_move));
    assert_eq!(result.score, expected_score);
    let summary = coordinator.last_round().unwrap();
    assert_eq!(summary.depth, 2);
    assert!(!summary.completed);

    let stats = finish(coordinator, cluster);
    assert!(stats.iter().map(|s| s.aborted).sum::<u64>() >= 1);
}

#[test]
fn test_timeout_reaches_worker_with_expired_lease() {
    let options = CoordinatorOptions::default()
        .with_depths(2, 2)
        .with_lease_timeout(Some(Duration::from_millis(30)))
        .with_shutdown_timeout(Duration::from_secs(5));
    let (mut coordinator, cluster) = tree_cluster(1, stall_strategy, options);
    let pos = TreeGame::random(11, 4);

    let result = coordinator.search(&pos, Some(Duration::from_millis(200)));
    assert_eq!(result.depth, 1);
    let summary = coordinator.last_round().unwrap();
    assert!(!summary.completed);
    assert_eq!(summary.redispatched, 1);

    let stats = finish(coordinator, cluster);
    assert_eq!(stats[0].jobs, 1);
    assert_eq!(stats[0].aborted, 1);
}

#[test]
fn test_round_counts_worker_cutoffs() {
    let options = CoordinatorOptions::default().with_depths(4, 4);
    let (mut coordinator, cluster) = tree_cluster(3, sorted_strategy, options);
    let pos = TreeGame::random(2, 5);
    let result = coordinator.search(&pos, None);
    assert_eq!(result.score, single_process(&pos, 4).score);
    let summary = coordinator.last_round().unwrap();
    assert!(summary.completed);

    let stats = finish(coordinator, cluster);
    let cutoffs: u64 = stats.iter().map(|s| s.cutoffs).sum();
    assert_eq!(u64::from(summary.cutoffs), cutoffs);
    assert_eq!(stats.iter().map(|s| s.aborted).sum::<u64>(), 0);
}

#[test]
fn test_silent_worker_job_is_reissued() {
    let (link, mut worker_links) = channel_links(2);
    let real_link = worker_links.pop().unwrap();
    let mut silent_link = worker_links.pop().unwrap();
    assert_eq!(silent_link.id(), 0);

    // Queued ahead of the real worker, so the silent worker gets the first job.
    silent_link
        .send(Message::<TreeMove>::RequestWork.encode().unwrap())
        .unwrap();
    let silent = thread::spawn(move || {
        let mut jobs = 0;
        while let Ok(frame) = silent_link.recv() {
            if let Ok(Message::JobData(_)) = Message::<TreeMove>::decode(&frame) {
                jobs += 1;
            }
        }
        jobs
    });
    let worker = Worker::new(
        1,
        real_link,
        sorted_strategy(),
        Box::new(TreeEval),
        WorkerOptions::default(),
    );
    let real = thread::spawn(move || worker.run());

    let options = CoordinatorOptions::default()
        .with_depths(3, 3)
        .with_lease_timeout(Some(Duration::from_millis(50)))
        .with_shutdown_timeout(Duration::from_millis(200));
    let mut coordinator: TreeCoordinator = Coordinator::new(link, Box::new(TreeEval), options);
    let pos = TreeGame::random(1, 4);
    let result = coordinator.search(&pos, None);

    assert_eq!(result.depth, 3);
    assert_eq!(result.score, single_process(&pos, 3).score);
    let summary = coordinator.last_round().unwrap();
    assert!(summary.completed);
    assert!(summary.redispatched >= 1);

    assert_eq!(coordinator.shutdown(), 1);
    drop(coordinator);
    assert_eq!(silent.join().unwrap(), 1);
    assert!(real.join().unwrap().is_ok());
}

#[test]
fn test_tcp_workers() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let workers: Vec<_> = (0..2)
        .map(|id| {
            thread::spawn(move || {
                let link = TcpWorkerLink::connect(addr).unwrap();
                Worker::new(
                    id,
                    link,
                    sorted_strategy(),
                    Box::new(TreeEval),
                    WorkerOptions::default(),
                )
                .run()
            })
        })
        .collect();

    let link = TcpCoordinatorLink::accept(&listener, 2).unwrap();
    let mut coordinator: Coordinator<TreeGame, TcpCoordinatorLink> = Coordinator::new(
        link,
        Box::new(TreeEval),
        CoordinatorOptions::default().with_depths(2, 3),
    );
    let pos = TreeGame::random(5, 4);
    let result = coordinator.search(&pos, None);
    assert_eq!(result.score, single_process(&pos, 3).score);
    assert_eq!(coordinator.shutdown(), 2);
    for handle in workers {
        assert!(handle.join().unwrap().is_ok());
    }
}
