//! Engine configuration.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::search::sampling::SamplingPolicy;
use crate::search::{DEFAULT_POLL_INTERVAL, StrategyKind};
use crate::time_control::DEFAULT_MOVE_TIME_MS;
use crate::types::Depth;

/// Settings of the distributed coordinator.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorOptions {
    /// First distributed round depth; rounds below 2 are not distributed.
    pub min_depth: Depth,
    /// Last round depth.
    pub max_depth: Depth,
    /// Longest wait for a worker message before the clock and leases are
    /// checked again.
    pub poll_slice: Duration,
    /// Jobs unanswered for this long are handed to another worker.
    pub lease_timeout: Option<Duration>,
    /// Upper bound on the time spent terminating workers.
    pub shutdown_timeout: Duration,
    /// Broadcast the new best score to busy workers whenever it improves.
    pub bound_updates: bool,
    /// Restrict the first ply to a sample of moves.
    pub sampling: Option<SamplingPolicy>,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        CoordinatorOptions {
            min_depth: 2,
            max_depth: 5,
            poll_slice: Duration::from_millis(2),
            lease_timeout: Some(Duration::from_secs(10)),
            shutdown_timeout: Duration::from_secs(5),
            bound_updates: true,
            sampling: None,
        }
    }
}

impl CoordinatorOptions {
    /// Override the depth range of the iterative deepening loop.
    #[must_use]
    pub fn with_depths(mut self, min_depth: Depth, max_depth: Depth) -> Self {
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        self
    }

    #[must_use]
    pub fn with_lease_timeout(mut self, lease_timeout: Option<Duration>) -> Self {
        self.lease_timeout = lease_timeout;
        self
    }

    #[must_use]
    pub fn with_bound_updates(mut self, enabled: bool) -> Self {
        self.bound_updates = enabled;
        self
    }

    #[must_use]
    pub fn with_sampling(mut self, sampling: Option<SamplingPolicy>) -> Self {
        self.sampling = sampling;
        self
    }

    #[must_use]
    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Rejects depth ranges that cannot produce a move.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(Error::Config("max depth must be at least 1".to_string()));
        }
        if self.poll_slice.is_zero() {
            return Err(Error::Config("poll slice must be positive".to_string()));
        }
        Ok(())
    }
}

/// Settings of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
    /// Node expansions between two checks for control messages.
    pub poll_interval: u32,
    /// Pause after a "no work yet" answer.
    pub idle_backoff: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        WorkerOptions {
            poll_interval: DEFAULT_POLL_INTERVAL,
            idle_backoff: Duration::from_millis(1),
        }
    }
}

/// Settings of a complete engine: local worker pool, strategy and time use.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub n_workers: usize,
    pub strategy: StrategyKind,
    /// Policy of the sampled strategy.
    pub sampling: SamplingPolicy,
    /// Base thinking time per move, scaled down as the clock runs low.
    pub move_time: Duration,
    /// Switch evaluation scheme after every own move.
    pub change_eval: bool,
    /// Stop after this many own moves.
    pub max_moves: Option<u32>,
    pub coordinator: CoordinatorOptions,
    pub worker: WorkerOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            n_workers: num_cpus::get().max(1),
            strategy: StrategyKind::default(),
            sampling: SamplingPolicy::default(),
            move_time: Duration::from_millis(DEFAULT_MOVE_TIME_MS),
            change_eval: true,
            max_moves: None,
            coordinator: CoordinatorOptions::default(),
            worker: WorkerOptions::default(),
        }
    }
}

impl EngineOptions {
    /// Override the number of workers when the default CPU count is not
    /// appropriate for the caller.
    #[must_use]
    pub fn with_workers(mut self, n_workers: Option<usize>) -> Self {
        if let Some(value) = n_workers {
            self.n_workers = value;
        }
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.sampling = sampling;
        self
    }

    #[must_use]
    pub fn with_move_time(mut self, move_time: Duration) -> Self {
        self.move_time = move_time;
        self
    }

    #[must_use]
    pub fn with_change_eval(mut self, change_eval: bool) -> Self {
        self.change_eval = change_eval;
        self
    }

    #[must_use]
    pub fn with_max_moves(mut self, max_moves: Option<u32>) -> Self {
        self.max_moves = max_moves;
        self
    }

    #[must_use]
    pub fn with_coordinator(mut self, coordinator: CoordinatorOptions) -> Self {
        self.coordinator = coordinator;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_workers == 0 {
            return Err(Error::Config("at least one worker is required".to_string()));
        }
        if self.move_time.is_zero() {
            return Err(Error::Config("move time must be positive".to_string()));
        }
        self.coordinator.validate()
    }
}
