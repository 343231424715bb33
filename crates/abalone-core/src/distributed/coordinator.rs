//! Root side of the distributed search.
//!
//! Every round searches the whole tree to one fixed depth. The coordinator
//! expands the first two plies itself, turns every (first move, reply) pair
//! into a job and hands jobs to workers on request. Job scores come back from
//! the root player's view; a branch is worth the minimum over its jobs and the
//! root takes the maximum over closed branches. Jobs of a branch that can no
//! longer beat the best closed branch are dropped before dispatch.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::distributed::branch::BranchState;
use crate::distributed::job::JobQueue;
use crate::distributed::protocol::{JobData, JobResult, Message, WireMove, WireState};
use crate::distributed::transport::CoordinatorLink;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::moves::MoveList;
use crate::options::CoordinatorOptions;
use crate::search::search_result::SearchResult;
use crate::search::{Position, SearchProgress, SearchProgressCallback};
use crate::types::{Depth, SCORE_INF, Score};

/// Statistics of the most recent round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub round: u32,
    pub depth: Depth,
    pub branches: usize,
    pub jobs: usize,
    /// False when the round was abandoned on timeout or disconnect.
    pub completed: bool,
    /// Jobs dropped without dispatch.
    pub skipped: u32,
    /// Jobs handed out again after their lease expired.
    pub redispatched: u32,
    /// Results that came back cut short by a bound update.
    pub cutoffs: u32,
    pub n_nodes: u64,
    pub elapsed: Duration,
}

enum RoundEnd<M> {
    Completed(Option<SearchResult<M>>),
    TimedOut,
    Disconnected,
}

/// Bookkeeping of the round in progress.
struct Round<M> {
    id: u32,
    depth: Depth,
    started: Instant,
    snapshot: Vec<u8>,
    branches: Vec<BranchState<M>>,
    queue: JobQueue<M>,
    /// Workers whose lease expired while they may still be searching.
    stale_holders: BTreeSet<usize>,
    /// Index and bound of the best closed branch.
    best: Option<(usize, Score)>,
    n_closed: usize,
    n_nodes: u64,
    skipped: u32,
    redispatched: u32,
    cutoffs: u32,
}

impl<M: Copy> Round<M> {
    fn new(id: u32, depth: Depth, snapshot: Vec<u8>) -> Self {
        Round {
            id,
            depth,
            started: Instant::now(),
            snapshot,
            branches: Vec::new(),
            queue: JobQueue::new(),
            stale_holders: BTreeSet::new(),
            best: None,
            n_closed: 0,
            n_nodes: 0,
            skipped: 0,
            redispatched: 0,
            cutoffs: 0,
        }
    }

    #[inline]
    fn best_score(&self) -> Option<Score> {
        self.best.map(|(_, score)| score)
    }

    #[inline]
    fn is_complete(&self) -> bool {
        self.n_closed == self.branches.len()
    }

    /// Lease holders plus workers still searching a job whose lease expired.
    fn busy_workers(&self) -> BTreeSet<usize> {
        self.queue
            .leased_workers()
            .chain(self.stale_holders.iter().copied())
            .collect()
    }

    fn summary(&self, completed: bool) -> RoundSummary {
        RoundSummary {
            round: self.id,
            depth: self.depth,
            branches: self.branches.len(),
            jobs: self.queue.len(),
            completed,
            skipped: self.skipped,
            redispatched: self.redispatched,
            cutoffs: self.cutoffs,
            n_nodes: self.n_nodes,
            elapsed: self.started.elapsed(),
        }
    }

    fn result(&self) -> Option<SearchResult<M>> {
        let (index, score) = self.best?;
        let branch = &self.branches[index];
        let mut result = SearchResult::new(
            Some(branch.first_move()),
            score,
            self.depth,
            self.n_nodes,
        );
        result.pv_line.extend(branch.best_reply());
        Some(result)
    }
}

/// Distributes iterative-deepening rounds over the workers behind a link.
pub struct Coordinator<P: Position, L> {
    link: L,
    evaluator: Box<dyn Evaluator<P>>,
    options: CoordinatorOptions,
    callback: Option<Arc<SearchProgressCallback<P::Move>>>,
    next_round: u32,
    /// Workers whose `RequestWork` has not been answered.
    waiting: Vec<bool>,
    alive: Vec<bool>,
    last_round: Option<RoundSummary>,
}

impl<P, L> Coordinator<P, L>
where
    P: Position + Clone + WireState,
    P::Move: WireMove,
    L: CoordinatorLink,
{
    /// Creates a coordinator.
    ///
    /// # Arguments
    ///
    /// * `link` - Connection to every worker
    /// * `evaluator` - Used for the depth-1 pick, first-ply sampling and
    ///   childless branches; its scheme is shipped with every job
    /// * `options` - Depth range, polling and lease settings
    pub fn new(link: L, evaluator: Box<dyn Evaluator<P>>, options: CoordinatorOptions) -> Self {
        let n_workers = link.worker_count();
        Coordinator {
            link,
            evaluator,
            options,
            callback: None,
            next_round: 1,
            waiting: vec![false; n_workers],
            alive: vec![true; n_workers],
            last_round: None,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.link.worker_count()
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: CoordinatorOptions) {
        self.options = options;
    }

    pub fn evaluator_mut(&mut self) -> &mut dyn Evaluator<P> {
        self.evaluator.as_mut()
    }

    /// Installs the callback fired whenever the root best move improves.
    pub fn set_callback(&mut self, callback: Option<Arc<SearchProgressCallback<P::Move>>>) {
        self.callback = callback;
    }

    /// Statistics of the last round started by [`Coordinator::search`].
    pub fn last_round(&self) -> Option<RoundSummary> {
        self.last_round
    }

    /// Searches `root` by iterative deepening until `max_depth` or until the
    /// budget runs out.
    ///
    /// A one-ply pick is computed locally first, so a move is available even
    /// when the first distributed round cannot finish in time. An unfinished
    /// round is abandoned and the previous round's move is kept.
    ///
    /// # Arguments
    ///
    /// * `root` - Position to search
    /// * `budget` - Wall-clock limit; `None` searches to `max_depth`
    ///
    /// # Returns
    ///
    /// The best move of the deepest completed round. `best_move` is `None`
    /// only when the side to move has no legal move or the game is decided.
    pub fn search(&mut self, root: &P, budget: Option<Duration>) -> SearchResult<P::Move> {
        let deadline = budget.map(|budget| Instant::now() + budget);
        let mut pos = root.clone();
        let mut result = self.baseline(&mut pos);
        let Some(first) = result.best_move else {
            return result;
        };
        self.report(1, result.score, first, result.n_nodes);

        let mut n_nodes = result.n_nodes;
        for depth in self.options.min_depth.max(2)..=self.options.max_depth {
            let end = self.run_round(&mut pos, depth, deadline);
            n_nodes += self.last_round.map_or(0, |summary| summary.n_nodes);
            match end {
                RoundEnd::Completed(Some(round_result)) => result = round_result,
                RoundEnd::Completed(None) => {}
                RoundEnd::TimedOut => {
                    info!("depth {depth} abandoned on timeout, keeping depth {}", result.depth);
                    break;
                }
                RoundEnd::Disconnected => {
                    warn!("no reachable worker left, keeping depth {}", result.depth);
                    break;
                }
            }
        }
        result.n_nodes = n_nodes;
        result
    }

    /// Terminates every worker: waiting ones right away, busy ones as soon
    /// as they ask for work again. Gives up after `shutdown_timeout`.
    ///
    /// # Returns
    ///
    /// The number of workers told to terminate.
    pub fn shutdown(&mut self) -> usize {
        let n_workers = self.link.worker_count();
        let mut done: Vec<bool> = self.alive.iter().map(|&alive| !alive).collect();
        let mut terminated = 0;
        for worker in 0..n_workers {
            if !done[worker] && self.waiting[worker] {
                done[worker] = true;
                terminated += usize::from(self.terminate(worker));
            }
        }

        let deadline = Instant::now() + self.options.shutdown_timeout;
        while done.iter().any(|&d| !d) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.link.recv_timeout(deadline - now) {
                Ok(Some((worker, frame))) if worker < n_workers => {
                    match Message::<P::Move>::decode(&frame) {
                        Ok(Message::RequestWork) if !done[worker] => {
                            done[worker] = true;
                            terminated += usize::from(self.terminate(worker));
                        }
                        Ok(message) => {
                            debug!("ignoring {} from worker {worker} at shutdown", message.name());
                        }
                        Err(err) => warn!("dropping malformed frame from worker {worker}: {err}"),
                    }
                }
                Ok(Some((worker, _))) => warn!("frame from unknown worker {worker}"),
                Ok(None) => {}
                Err(_) => {
                    done.fill(true);
                    break;
                }
            }
        }

        let stragglers = done.iter().filter(|&&d| !d).count();
        if stragglers > 0 {
            warn!("{stragglers} worker(s) did not ask for work before the shutdown timeout");
        }
        self.waiting.fill(false);
        self.alive.fill(false);
        info!("terminated {terminated} of {n_workers} worker(s)");
        terminated
    }

    /// One-ply pick used as the depth-1 result.
    fn baseline(&self, pos: &mut P) -> SearchResult<P::Move> {
        if !pos.is_valid() {
            return SearchResult::no_move(self.evaluator.calc_evaluation(pos), 0, 1);
        }
        let moves = pos.generate_moves();
        let mut best_move = None;
        let mut best = -SCORE_INF;
        let mut n_nodes = 1;
        for &mv in moves.iter() {
            if pos.play_move(mv) {
                n_nodes += 1;
                let score = -self.evaluator.calc_evaluation(pos);
                if score > best {
                    best = score;
                    best_move = Some(mv);
                }
            }
            pos.take_back();
        }
        match best_move {
            Some(mv) => SearchResult::new(Some(mv), best, 1, n_nodes),
            None => SearchResult::no_move(self.evaluator.calc_evaluation(pos), 0, n_nodes),
        }
    }

    fn run_round(
        &mut self,
        pos: &mut P,
        depth: Depth,
        deadline: Option<Instant>,
    ) -> RoundEnd<P::Move> {
        let id = self.next_round;
        self.next_round = self.next_round.wrapping_add(1).max(1);

        let mut round = self.plan(pos, id, depth);
        debug!(
            "round {id}: depth {depth}, {} branches, {} jobs",
            round.branches.len(),
            round.queue.len()
        );
        for index in 0..round.branches.len() {
            if round.branches[index].is_closed() {
                self.on_branch_closed(&mut round, index);
            }
        }
        self.serve_waiting(&mut round);

        let end = loop {
            if round.is_complete() {
                break RoundEnd::Completed(round.result());
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                self.abort_round(&round);
                break RoundEnd::TimedOut;
            }
            if let Some(timeout) = self.options.lease_timeout {
                self.expire_leases(&mut round, timeout);
            }
            if !self.alive.iter().any(|&alive| alive) {
                break RoundEnd::Disconnected;
            }
            match self.link.recv_timeout(self.options.poll_slice) {
                Ok(Some((worker, frame))) => {
                    self.handle_frame(&mut round, worker, &frame);
                    if let Err(err) = self.drain(&mut round) {
                        warn!("round {id}: {err}");
                        break RoundEnd::Disconnected;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!("round {id}: {err}");
                    break RoundEnd::Disconnected;
                }
            }
        };

        let summary = round.summary(matches!(end, RoundEnd::Completed(_)));
        if let RoundEnd::Completed(Some(result)) = &end {
            info!(
                "depth {depth}: best {:?} score {} ({} branches, {} jobs, {} skipped, {} nodes, {} ms)",
                result.best_move,
                result.score,
                summary.branches,
                summary.jobs,
                summary.skipped,
                summary.n_nodes,
                summary.elapsed.as_millis()
            );
        }
        self.last_round = Some(summary);
        end
    }

    /// Expands the first two plies into branches and jobs.
    fn plan(&self, pos: &mut P, id: u32, depth: Depth) -> Round<P::Move> {
        let mut moves = pos.generate_moves();
        if let Some(policy) = self.options.sampling {
            policy.apply(pos, self.evaluator.as_ref(), &mut moves);
        }

        let mut round = Round::new(id, depth, pos.encode_state());
        for &first in moves.iter() {
            if !pos.play_move(first) {
                pos.take_back();
                continue;
            }
            let replies = if pos.is_valid() {
                pos.generate_moves()
            } else {
                MoveList::new()
            };
            let branch = round.branches.len() as u32;
            if replies.is_empty() {
                let bound = -self.evaluator.calc_evaluation(pos);
                round.branches.push(BranchState::closed(first, bound));
            } else {
                for &second in replies.iter() {
                    round.queue.push(branch, first, second);
                }
                round
                    .branches
                    .push(BranchState::new(first, replies.count() as u32));
            }
            pos.take_back();
        }
        round
    }

    /// Handles every frame already queued on the link without waiting.
    fn drain(&mut self, round: &mut Round<P::Move>) -> Result<()> {
        while !round.is_complete() {
            let Some((worker, frame)) = self.link.try_recv()? else {
                break;
            };
            self.handle_frame(round, worker, &frame);
        }
        Ok(())
    }

    fn handle_frame(&mut self, round: &mut Round<P::Move>, worker: usize, frame: &[u8]) {
        if worker >= self.waiting.len() {
            warn!("frame from unknown worker {worker}");
            return;
        }
        self.alive[worker] = true;
        match Message::<P::Move>::decode(frame) {
            Ok(Message::RequestWork) => {
                self.waiting[worker] = true;
                self.dispatch(round, worker);
            }
            Ok(Message::Result(result)) => self.intake(round, worker, result),
            Ok(message) => warn!("unexpected {} from worker {worker}", message.name()),
            Err(err) => warn!("dropping malformed frame from worker {worker}: {err}"),
        }
    }

    fn serve_waiting(&mut self, round: &mut Round<P::Move>) {
        for worker in 0..self.waiting.len() {
            if self.waiting[worker] && self.alive[worker] {
                self.dispatch(round, worker);
            }
        }
    }

    /// Answers a pending `RequestWork` of `worker`.
    ///
    /// Jobs whose branch bound is already at or below the best closed branch
    /// are completed without being sent. A worker that cannot be reached is
    /// marked dead and its job goes back to the front of the backlog.
    fn dispatch(&mut self, round: &mut Round<P::Move>, worker: usize) {
        while let Some(job) = round.queue.pop() {
            let index = job.branch as usize;
            let bound = round.branches[index].bound();
            let best = round.best_score();
            if best.is_some_and(|best| bound <= best) {
                round.queue.finish(job.id);
                round.skipped += 1;
                if round.branches[index].skip() {
                    self.on_branch_closed(round, index);
                }
                continue;
            }

            let message = Message::JobData(JobData {
                round: round.id,
                job_id: job.id,
                branch: job.branch,
                alpha: best.unwrap_or(-SCORE_INF),
                beta: bound,
                depth: round.depth,
                eval_scheme: self.evaluator.scheme(),
                first: job.first,
                second: job.second,
                state: round.snapshot.clone(),
            });
            match self.send(worker, &message) {
                Ok(()) => {
                    round.branches[index].mark_dispatched();
                    round.queue.lease(job.id, worker, Instant::now());
                    self.waiting[worker] = false;
                    debug!(
                        "round {}: job {} (branch {index}) -> worker {worker}",
                        round.id, job.id
                    );
                }
                Err(err) => {
                    warn!("worker {worker} unreachable: {err}");
                    round.queue.requeue(job.id);
                    self.mark_dead(worker);
                }
            }
            return;
        }

        if !round.queue.all_finished() {
            debug!(
                "round {}: no work for worker {worker}, backlog {}",
                round.id,
                round.queue.backlog_len()
            );
            match self.send(worker, &Message::NoWorkYet) {
                Ok(()) => self.waiting[worker] = false,
                Err(err) => {
                    warn!("worker {worker} unreachable: {err}");
                    self.mark_dead(worker);
                }
            }
        }
    }

    fn intake(&mut self, round: &mut Round<P::Move>, worker: usize, result: JobResult<P::Move>) {
        if result.round != round.id {
            debug!(
                "dropping result of round {} from worker {worker} during round {}",
                result.round, round.id
            );
            return;
        }
        let holder = round.queue.lease_of(result.job_id).map(|lease| lease.worker);
        if holder.is_some_and(|holder| holder != worker) {
            debug!(
                "job {} answered by worker {worker} before its new holder",
                result.job_id
            );
        }
        round.stale_holders.remove(&worker);
        let Some(job) = round.queue.finish(result.job_id) else {
            debug!("dropping duplicate result for job {} from worker {worker}", result.job_id);
            return;
        };
        if job.branch != result.branch {
            warn!(
                "worker {worker} reported job {} under branch {}, expected {}",
                job.id, result.branch, job.branch
            );
        }
        round.n_nodes += result.nodes;
        if result.cutoff {
            round.cutoffs += 1;
        }
        let index = job.branch as usize;
        if round.branches[index].record(result.score, job.second) {
            self.on_branch_closed(round, index);
        }
    }

    fn on_branch_closed(&mut self, round: &mut Round<P::Move>, index: usize) {
        round.n_closed += 1;
        let branch = &round.branches[index];
        let (first, bound) = (branch.first_move(), branch.bound());
        debug!(
            "round {}: branch {index} ({first:?}) closed at {bound}, {} of {} jobs dispatched",
            round.id,
            branch.dispatched(),
            branch.children()
        );
        if round.best_score().is_some_and(|best| bound <= best) {
            return;
        }
        round.best = Some((index, bound));
        self.report(round.depth, bound, first, round.n_nodes);

        if self.options.bound_updates {
            let busy = round.busy_workers();
            let update = Message::BoundUpdate {
                round: round.id,
                alpha: bound,
            };
            for worker in busy {
                if let Err(err) = self.send(worker, &update) {
                    debug!("bound update to worker {worker} failed: {err}");
                }
            }
        }
    }

    /// Requeues jobs whose worker stayed silent for `timeout`.
    fn expire_leases(&mut self, round: &mut Round<P::Move>, timeout: Duration) {
        let expired = round.queue.expire(Instant::now(), timeout);
        if expired.is_empty() {
            return;
        }
        for (job, worker) in &expired {
            round.stale_holders.insert(*worker);
            warn!(
                "round {}: job {} on worker {worker} timed out, reissuing",
                round.id, job.id
            );
        }
        round.redispatched += expired.len() as u32;
        self.serve_waiting(round);
    }

    /// Stops every worker that may still search for this round, including
    /// holders of expired leases.
    fn abort_round(&mut self, round: &Round<P::Move>) {
        let busy = round.busy_workers();
        let abort = Message::TimeoutAbort { round: round.id };
        for worker in busy {
            if let Err(err) = self.send(worker, &abort) {
                debug!("abort to worker {worker} failed: {err}");
            }
        }
    }

    fn terminate(&mut self, worker: usize) -> bool {
        self.waiting[worker] = false;
        match self.send(worker, &Message::Terminate) {
            Ok(()) => true,
            Err(err) => {
                debug!("terminate to worker {worker} failed: {err}");
                false
            }
        }
    }

    fn mark_dead(&mut self, worker: usize) {
        self.alive[worker] = false;
        self.waiting[worker] = false;
    }

    fn send(&mut self, worker: usize, message: &Message<P::Move>) -> Result<()> {
        let frame = message.encode()?;
        self.link.send(worker, frame)
    }

    fn report(&self, depth: Depth, score: Score, best_move: P::Move, nodes: u64) {
        if let Some(callback) = &self.callback {
            callback(SearchProgress {
                depth,
                score,
                best_move,
                nodes,
            });
        }
    }
}
