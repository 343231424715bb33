//! Worker side of the distributed search.

use std::marker::PhantomData;
use std::thread;

use log::{debug, info, warn};

use crate::distributed::protocol::{JobData, JobResult, Message, WireMove, WireState};
use crate::distributed::transport::WorkerLink;
use crate::error::Result;
use crate::eval::Evaluator;
use crate::options::WorkerOptions;
use crate::search::{Cancelled, Position, SearchControl, SearchParams, SearchStrategy};
use crate::types::{Depth, SCORE_INF, Score};

/// Plies played by the coordinator before a job starts.
const JOB_STARTING_DEPTH: Depth = 2;

/// Counters reported when a worker exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub jobs: u64,
    /// Jobs stopped by a bound update.
    pub cutoffs: u64,
    /// Jobs stopped by a timeout abort.
    pub aborted: u64,
    pub n_nodes: u64,
}

/// Why a job search was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Abort,
    Cutoff,
    Terminate,
}

/// Search control that drains the link while a job runs.
struct JobControl<'a, L, M> {
    link: &'a mut L,
    round: u32,
    beta: Score,
    interrupt: Option<Interrupt>,
    _move: PhantomData<fn() -> M>,
}

impl<'a, L: WorkerLink, M: WireMove> JobControl<'a, L, M> {
    fn new(link: &'a mut L, round: u32, beta: Score) -> Self {
        JobControl {
            link,
            round,
            beta,
            interrupt: None,
            _move: PhantomData,
        }
    }
}

impl<L: WorkerLink, M: WireMove> SearchControl for JobControl<'_, L, M> {
    fn should_stop(&mut self) -> bool {
        if self.interrupt.is_some() {
            return true;
        }
        loop {
            let frame = match self.link.try_recv() {
                Ok(Some(frame)) => frame,
                Ok(None) => return false,
                Err(_) => {
                    self.interrupt = Some(Interrupt::Terminate);
                    return true;
                }
            };
            self.interrupt = match Message::<M>::decode(&frame) {
                Ok(Message::TimeoutAbort { round }) if round == self.round => {
                    Some(Interrupt::Abort)
                }
                Ok(Message::BoundUpdate { round, alpha })
                    if round == self.round && alpha >= self.beta =>
                {
                    Some(Interrupt::Cutoff)
                }
                Ok(Message::Terminate) => Some(Interrupt::Terminate),
                Ok(message) => {
                    debug!("ignoring {} during a job", message.name());
                    None
                }
                Err(err) => {
                    warn!("dropping malformed frame: {err}");
                    None
                }
            };
            if self.interrupt.is_some() {
                return true;
            }
        }
    }
}

enum Reply<M> {
    Job(JobData<M>),
    Idle,
    Terminate,
}

/// Searches jobs handed out by a coordinator until told to terminate.
pub struct Worker<P: Position, L> {
    id: usize,
    link: L,
    strategy: Box<dyn SearchStrategy<P>>,
    evaluator: Box<dyn Evaluator<P>>,
    options: WorkerOptions,
    stats: WorkerStats,
}

impl<P, L> Worker<P, L>
where
    P: Position + WireState,
    P::Move: WireMove,
    L: WorkerLink,
{
    pub fn new(
        id: usize,
        link: L,
        strategy: Box<dyn SearchStrategy<P>>,
        evaluator: Box<dyn Evaluator<P>>,
        options: WorkerOptions,
    ) -> Self {
        Worker {
            id,
            link,
            strategy,
            evaluator,
            options,
            stats: WorkerStats::default(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Runs the request/search/report loop.
    ///
    /// # Returns
    ///
    /// The worker's counters once the coordinator sent `Terminate`.
    ///
    /// # Errors
    ///
    /// Returns the link error if the coordinator went away.
    pub fn run(mut self) -> Result<WorkerStats> {
        info!("worker {} started with {}", self.id, self.strategy.name());
        loop {
            self.send(&Message::RequestWork)?;
            match self.await_reply()? {
                Reply::Job(job) => {
                    if !self.run_job(job)? {
                        break;
                    }
                }
                Reply::Idle => thread::sleep(self.options.idle_backoff),
                Reply::Terminate => break,
            }
        }
        info!(
            "worker {} done: {} jobs, {} cutoffs, {} aborted, {} nodes",
            self.id, self.stats.jobs, self.stats.cutoffs, self.stats.aborted, self.stats.n_nodes
        );
        Ok(self.stats)
    }

    /// Waits for the answer to `RequestWork`, skipping control messages of
    /// rounds that already ended.
    fn await_reply(&mut self) -> Result<Reply<P::Move>> {
        loop {
            let frame = self.link.recv()?;
            match Message::<P::Move>::decode(&frame) {
                Ok(Message::JobData(job)) => return Ok(Reply::Job(job)),
                Ok(Message::NoWorkYet) => return Ok(Reply::Idle),
                Ok(Message::Terminate) => return Ok(Reply::Terminate),
                Ok(message) => debug!("worker {} ignoring stale {}", self.id, message.name()),
                Err(err) => warn!("worker {} dropping malformed frame: {err}", self.id),
            }
        }
    }

    /// Searches one job and reports it.
    ///
    /// # Returns
    ///
    /// `false` if the worker has to exit.
    fn run_job(&mut self, job: JobData<P::Move>) -> Result<bool> {
        self.stats.jobs += 1;
        let mut pos = match P::decode_state(&job.state) {
            Ok(pos) => pos,
            Err(err) => {
                warn!("worker {}: job {} has a bad snapshot: {err}", self.id, job.job_id);
                self.report(&job, -SCORE_INF, false, 0)?;
                return Ok(true);
            }
        };
        self.evaluator.set_scheme(job.eval_scheme);
        if !pos.play_move(job.first) || !pos.play_move(job.second) {
            warn!("worker {}: job {} does not apply to its snapshot", self.id, job.job_id);
            self.report(&job, -SCORE_INF, false, 0)?;
            return Ok(true);
        }

        let params = SearchParams::new(job.depth)
            .with_starting_depth(JOB_STARTING_DEPTH)
            .with_window(job.alpha, job.beta)
            .with_poll_interval(self.options.poll_interval);
        let mut control = JobControl::<L, P::Move>::new(&mut self.link, job.round, job.beta);
        let outcome = self
            .strategy
            .search(&mut pos, self.evaluator.as_ref(), &params, &mut control);
        let interrupt = control.interrupt;

        match (outcome, interrupt) {
            (_, Some(Interrupt::Terminate)) => return Ok(false),
            (Ok(result), _) => {
                self.stats.n_nodes += result.n_nodes;
                self.report(&job, result.score, false, result.n_nodes)?;
            }
            (Err(Cancelled { n_nodes }), Some(Interrupt::Cutoff)) => {
                self.stats.cutoffs += 1;
                self.stats.n_nodes += n_nodes;
                self.report(&job, job.beta, true, n_nodes)?;
            }
            (Err(Cancelled { n_nodes }), _) => {
                self.stats.aborted += 1;
                self.stats.n_nodes += n_nodes;
                debug!("worker {}: job {} aborted", self.id, job.job_id);
            }
        }
        Ok(true)
    }

    fn report(
        &mut self,
        job: &JobData<P::Move>,
        score: Score,
        cutoff: bool,
        nodes: u64,
    ) -> Result<()> {
        self.send(&Message::Result(JobResult {
            round: job.round,
            job_id: job.job_id,
            branch: job.branch,
            reply: job.second,
            score,
            cutoff,
            nodes,
        }))
    }

    fn send(&mut self, message: &Message<P::Move>) -> Result<()> {
        let frame = message.encode()?;
        self.link.send(frame)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::board::Board;
    use crate::distributed::transport::{ChannelCoordinatorLink, CoordinatorLink, channel_links};
    use crate::eval::SchemeEvaluator;
    use crate::moves::Move;
    use crate::search::alpha_beta::{AlphaBeta, MoveOrdering};
    use crate::search::sampling::SamplingPolicy;
    use crate::search::{NeverStop, StrategyKind};

    fn start_worker() -> (ChannelCoordinatorLink, thread::JoinHandle<Result<WorkerStats>>) {
        let (coordinator, mut links) = channel_links(1);
        let worker = Worker::new(
            0,
            links.remove(0),
            StrategyKind::AlphaBeta.create::<Board>(SamplingPolicy::default()),
            Box::new(SchemeEvaluator::new()),
            WorkerOptions::default(),
        );
        (coordinator, thread::spawn(move || worker.run()))
    }

    fn send(link: &mut ChannelCoordinatorLink, message: &Message<Move>) {
        link.send(0, message.encode().unwrap()).unwrap();
    }

    fn next_message(link: &mut ChannelCoordinatorLink) -> Message<Move> {
        let (worker, frame) = link
            .recv_timeout(Duration::from_secs(30))
            .unwrap()
            .unwrap();
        assert_eq!(worker, 0);
        Message::decode(&frame).unwrap()
    }

    fn job(round: u32, beta: Score, depth: Depth) -> JobData<Move> {
        let mut board = Board::new();
        let first = board.generate_moves().get(0).unwrap();
        board.play_move(first);
        let second = board.generate_moves().get(0).unwrap();
        JobData {
            round,
            job_id: 3,
            branch: 1,
            alpha: -SCORE_INF,
            beta,
            depth,
            eval_scheme: 0,
            first,
            second,
            state: Board::new().encode_state(),
        }
    }

    fn expected_score(job: &JobData<Move>) -> Score {
        let mut board = Board::new();
        board.play_move(job.first);
        board.play_move(job.second);
        let mut eval = SchemeEvaluator::new();
        eval.set_scheme(job.eval_scheme);
        let params = SearchParams::new(job.depth)
            .with_starting_depth(JOB_STARTING_DEPTH)
            .with_window(job.alpha, job.beta);
        AlphaBeta::<Move>::new(MoveOrdering::Natural)
            .search(&mut board, &eval, &params, &mut NeverStop)
            .unwrap()
            .score
    }

    #[test]
    fn test_bound_update_closing_window_cuts_job() {
        let (mut link, handle) = start_worker();
        assert_eq!(next_message(&mut link), Message::RequestWork);

        let job = job(9, 77, 7);
        send(&mut link, &Message::JobData(job.clone()));
        send(&mut link, &Message::BoundUpdate { round: 9, alpha: 77 });

        let Message::Result(result) = next_message(&mut link) else {
            panic!("expected a result");
        };
        assert!(result.cutoff);
        assert_eq!(result.score, 77);
        assert_eq!(result.round, 9);
        assert_eq!(result.job_id, 3);
        assert_eq!(result.branch, 1);
        assert_eq!(result.reply, job.second);
        assert!(result.nodes > 0);

        assert_eq!(next_message(&mut link), Message::RequestWork);
        send(&mut link, &Message::Terminate);
        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats.jobs, 1);
        assert_eq!(stats.cutoffs, 1);
        assert_eq!(stats.aborted, 0);
        assert_eq!(stats.n_nodes, result.nodes);
    }

    #[test]
    fn test_stale_or_open_bound_update_is_ignored() {
        let (mut link, handle) = start_worker();
        assert_eq!(next_message(&mut link), Message::RequestWork);

        let job = job(4, 77, 4);
        send(&mut link, &Message::JobData(job.clone()));
        send(&mut link, &Message::BoundUpdate { round: 3, alpha: 500 });
        send(&mut link, &Message::BoundUpdate { round: 4, alpha: 10 });

        let Message::Result(result) = next_message(&mut link) else {
            panic!("expected a result");
        };
        assert!(!result.cutoff);
        assert_eq!(result.score, expected_score(&job));
        assert!(result.nodes > 0);

        assert_eq!(next_message(&mut link), Message::RequestWork);
        send(&mut link, &Message::Terminate);
        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats.jobs, 1);
        assert_eq!(stats.cutoffs, 0);
        assert_eq!(stats.n_nodes, result.nodes);
    }

    #[test]
    fn test_timeout_abort_sends_no_result() {
        let (mut link, handle) = start_worker();
        assert_eq!(next_message(&mut link), Message::RequestWork);

        send(&mut link, &Message::JobData(job(6, SCORE_INF, 7)));
        send(&mut link, &Message::TimeoutAbort { round: 5 });
        send(&mut link, &Message::TimeoutAbort { round: 6 });

        assert_eq!(next_message(&mut link), Message::RequestWork);
        send(&mut link, &Message::Terminate);
        let stats = handle.join().unwrap().unwrap();
        assert_eq!(stats.jobs, 1);
        assert_eq!(stats.aborted, 1);
        assert!(stats.n_nodes > 0);
    }

    #[test]
    fn test_unusable_job_reports_lowest_score() {
        let (mut link, handle) = start_worker();
        assert_eq!(next_message(&mut link), Message::RequestWork);

        let mut bad = job(2, SCORE_INF, 3);
        bad.state = b"garbage".to_vec();
        send(&mut link, &Message::JobData(bad));
        let Message::Result(result) = next_message(&mut link) else {
            panic!("expected a result");
        };
        assert_eq!(result.score, -SCORE_INF);
        assert!(!result.cutoff);

        assert_eq!(next_message(&mut link), Message::RequestWork);
        send(&mut link, &Message::Terminate);
        assert_eq!(handle.join().unwrap().unwrap().jobs, 1);
    }
}
