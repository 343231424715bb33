use std::hint::black_box;
use std::time::Duration;

use abalone_core::board::Board;
use abalone_core::distributed::spawn_engine;
use abalone_core::eval::SchemeEvaluator;
use abalone_core::options::{CoordinatorOptions, EngineOptions};
use abalone_core::search::sampling::SamplingPolicy;
use abalone_core::search::{NeverStop, SearchParams, SearchStrategy, StrategyKind};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

const DEPTH: u32 = 3;

fn strategy_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategy");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    let eval = SchemeEvaluator::new();
    let params = SearchParams::new(DEPTH);
    for kind in [
        StrategyKind::AlphaBeta,
        StrategyKind::AlphaBetaSorted,
        StrategyKind::Sampled,
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(kind), &kind, |b, &kind| {
            let mut strategy = kind.create::<Board>(SamplingPolicy::default());
            let mut board = Board::new();
            b.iter(|| {
                let result = strategy
                    .search(&mut board, &eval, &params, &mut NeverStop)
                    .unwrap_or_else(|_| panic!("uncancellable search was cancelled"));
                black_box(result.score)
            });
        });
    }
    group.finish();
}

fn distributed_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("distributed");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for n_workers in [1, 2, 4] {
        let options = EngineOptions::default()
            .with_workers(Some(n_workers))
            .with_coordinator(CoordinatorOptions::default().with_depths(2, DEPTH));
        let (mut coordinator, cluster) =
            spawn_engine(&options).unwrap_or_else(|err| panic!("cannot start workers: {err}"));
        let board = Board::new();
        group.bench_with_input(BenchmarkId::from_parameter(n_workers), &board, |b, board| {
            b.iter(|| black_box(coordinator.search(board, None).score));
        });
        coordinator.shutdown();
        cluster.join();
    }
    group.finish();
}

criterion_group!(benches, strategy_benchmark, distributed_benchmark);
criterion_main!(benches);
