//! In-process cluster: workers on threads, wired with channel links.

use std::thread::{self, JoinHandle};

use log::warn;

use crate::board::Board;
use crate::distributed::coordinator::Coordinator;
use crate::distributed::protocol::{WireMove, WireState};
use crate::distributed::transport::{ChannelCoordinatorLink, channel_links};
use crate::distributed::worker::{Worker, WorkerStats};
use crate::error::Result;
use crate::eval::{Evaluator, SchemeEvaluator};
use crate::options::{EngineOptions, WorkerOptions};
use crate::search::{Position, SearchStrategy};

/// Handles of the worker threads of a local cluster.
pub struct LocalCluster {
    handles: Vec<JoinHandle<Result<WorkerStats>>>,
}

impl LocalCluster {
    /// Spawns `n_workers` worker threads.
    ///
    /// # Arguments
    ///
    /// * `n_workers` - Number of threads
    /// * `options` - Worker polling settings
    /// * `factory` - Builds the strategy and evaluator of worker `id`
    ///
    /// # Returns
    ///
    /// The coordinator end of the links and the cluster handle.
    pub fn spawn<P, F>(
        n_workers: usize,
        options: WorkerOptions,
        factory: F,
    ) -> Result<(ChannelCoordinatorLink, LocalCluster)>
    where
        P: Position + WireState + 'static,
        P::Move: WireMove,
        F: Fn(usize) -> (Box<dyn SearchStrategy<P>>, Box<dyn Evaluator<P>>),
    {
        let (link, worker_links) = channel_links(n_workers);
        let mut handles = Vec::with_capacity(n_workers);
        for worker_link in worker_links {
            let id = worker_link.id();
            let (strategy, evaluator) = factory(id);
            let worker = Worker::new(id, worker_link, strategy, evaluator, options);
            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker.run())?;
            handles.push(handle);
        }
        Ok((link, LocalCluster { handles }))
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Waits for every worker thread. Call after the coordinator shut the
    /// workers down or was dropped.
    ///
    /// # Returns
    ///
    /// Counters of the workers that exited cleanly.
    pub fn join(self) -> Vec<WorkerStats> {
        let mut stats = Vec::with_capacity(self.handles.len());
        for (id, handle) in self.handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(worker_stats)) => stats.push(worker_stats),
                Ok(Err(err)) => warn!("worker {id} stopped: {err}"),
                Err(_) => warn!("worker {id} panicked"),
            }
        }
        stats
    }
}

/// Coordinator over a local Abalone cluster, configured from `options`.
pub type LocalCoordinator = Coordinator<Board, ChannelCoordinatorLink>;

/// Starts `options.n_workers` Abalone workers and the coordinator that
/// drives them.
pub fn spawn_engine(options: &EngineOptions) -> Result<(LocalCoordinator, LocalCluster)> {
    options.validate()?;
    let strategy = options.strategy;
    let sampling = options.sampling;
    let (link, cluster) = LocalCluster::spawn(options.n_workers, options.worker, |_| {
        (
            strategy.create::<Board>(sampling),
            Box::new(SchemeEvaluator::new()) as Box<dyn Evaluator<Board>>,
        )
    })?;
    let coordinator = Coordinator::new(
        link,
        Box::new(SchemeEvaluator::new()),
        options.coordinator.clone(),
    );
    Ok((coordinator, cluster))
}
