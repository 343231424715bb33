//! Job backlog and leases of a distributed round.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// One (first move, second move) pair searched by a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchJob<M> {
    pub id: u32,
    pub branch: u32,
    pub first: M,
    pub second: M,
}

/// A job handed to a worker and not yet answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lease {
    pub worker: usize,
    pub issued: Instant,
}

/// Backlog, in-flight leases and completion flags for the jobs of one round.
///
/// Job ids are dense and assigned in creation order. A job completes exactly
/// once; a job whose lease expired goes back to the front of the backlog and
/// whichever copy answers first completes it.
#[derive(Debug)]
pub struct JobQueue<M> {
    jobs: Vec<SearchJob<M>>,
    backlog: VecDeque<u32>,
    leases: BTreeMap<u32, Lease>,
    finished: Vec<bool>,
    n_finished: usize,
}

impl<M: Copy> Default for JobQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Copy> JobQueue<M> {
    pub fn new() -> Self {
        JobQueue {
            jobs: Vec::new(),
            backlog: VecDeque::new(),
            leases: BTreeMap::new(),
            finished: Vec::new(),
            n_finished: 0,
        }
    }

    /// Appends a job to the backlog and returns its id.
    pub fn push(&mut self, branch: u32, first: M, second: M) -> u32 {
        let id = self.jobs.len() as u32;
        self.jobs.push(SearchJob {
            id,
            branch,
            first,
            second,
        });
        self.finished.push(false);
        self.backlog.push_back(id);
        id
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Takes the next unfinished job off the backlog.
    pub fn pop(&mut self) -> Option<SearchJob<M>> {
        while let Some(id) = self.backlog.pop_front() {
            if !self.finished[id as usize] {
                return Some(self.jobs[id as usize]);
            }
        }
        None
    }

    /// Puts job `id` back at the front of the backlog after a failed send.
    pub fn requeue(&mut self, id: u32) {
        if !self.is_finished(id) {
            self.leases.remove(&id);
            self.backlog.push_front(id);
        }
    }

    /// Records that job `id` was sent to `worker` at `now`.
    pub fn lease(&mut self, id: u32, worker: usize, now: Instant) {
        self.leases.insert(id, Lease { worker, issued: now });
    }

    /// Marks job `id` complete and drops its lease.
    ///
    /// # Returns
    ///
    /// The job, or `None` if the id is unknown or the job was already
    /// complete.
    pub fn finish(&mut self, id: u32) -> Option<SearchJob<M>> {
        let done = self.finished.get_mut(id as usize)?;
        if *done {
            return None;
        }
        *done = true;
        self.n_finished += 1;
        self.leases.remove(&id);
        Some(self.jobs[id as usize])
    }

    pub fn is_finished(&self, id: u32) -> bool {
        self.finished.get(id as usize).copied().unwrap_or(false)
    }

    /// Returns true once every job completed.
    pub fn all_finished(&self) -> bool {
        self.n_finished == self.jobs.len()
    }

    /// Number of jobs waiting for a worker.
    pub fn backlog_len(&self) -> usize {
        self.backlog
            .iter()
            .filter(|&&id| !self.finished[id as usize])
            .count()
    }

    /// Workers currently holding a lease.
    pub fn leased_workers(&self) -> impl Iterator<Item = usize> + '_ {
        self.leases.values().map(|lease| lease.worker)
    }

    /// Returns the lease of job `id`.
    pub fn lease_of(&self, id: u32) -> Option<Lease> {
        self.leases.get(&id).copied()
    }

    /// Requeues every job whose lease is older than `timeout`.
    ///
    /// # Returns
    ///
    /// The requeued jobs with the worker that held them.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<(SearchJob<M>, usize)> {
        let expired: Vec<(u32, usize)> = self
            .leases
            .iter()
            .filter(|(_, lease)| now.duration_since(lease.issued) >= timeout)
            .map(|(&id, lease)| (id, lease.worker))
            .collect();
        let mut requeued = Vec::with_capacity(expired.len());
        for &(id, worker) in expired.iter().rev() {
            self.leases.remove(&id);
            self.backlog.push_front(id);
            requeued.push((self.jobs[id as usize], worker));
        }
        requeued.reverse();
        requeued
    }
}
