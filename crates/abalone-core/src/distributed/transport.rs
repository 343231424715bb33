//! Frame transports between the coordinator and its workers.
//!
//! The coordinator and workers only exchange encoded frames through these
//! traits, so the same loops run over in-process channels and over TCP.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};

use crate::error::{Error, Result};

/// A frame received by the coordinator, tagged with the sending worker.
pub type Incoming = (usize, Vec<u8>);

/// Coordinator side of a link to all workers.
pub trait CoordinatorLink: Send {
    fn worker_count(&self) -> usize;

    /// Sends a frame to worker `worker`.
    fn send(&mut self, worker: usize, frame: Vec<u8>) -> Result<()>;

    /// Returns a pending frame from any worker without blocking.
    fn try_recv(&mut self) -> Result<Option<Incoming>>;

    /// Waits up to `timeout` for a frame from any worker.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Disconnected`] once every worker is gone.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Incoming>>;
}

/// Worker side of a link to the coordinator.
pub trait WorkerLink: Send {
    fn send(&mut self, frame: Vec<u8>) -> Result<()>;

    /// Blocks until the coordinator sends a frame.
    fn recv(&mut self) -> Result<Vec<u8>>;

    /// Returns a pending frame without blocking.
    fn try_recv(&mut self) -> Result<Option<Vec<u8>>>;
}

/// In-process coordinator link over crossbeam channels.
pub struct ChannelCoordinatorLink {
    inbox: Receiver<Incoming>,
    outboxes: Vec<Sender<Vec<u8>>>,
}

/// In-process worker link over crossbeam channels.
pub struct ChannelWorkerLink {
    id: usize,
    outbox: Sender<Incoming>,
    inbox: Receiver<Vec<u8>>,
}

impl ChannelWorkerLink {
    pub fn id(&self) -> usize {
        self.id
    }
}

/// Creates a coordinator link and `n_workers` connected worker links.
pub fn channel_links(n_workers: usize) -> (ChannelCoordinatorLink, Vec<ChannelWorkerLink>) {
    let (up_tx, up_rx) = unbounded();
    let mut outboxes = Vec::with_capacity(n_workers);
    let mut workers = Vec::with_capacity(n_workers);
    for id in 0..n_workers {
        let (down_tx, down_rx) = unbounded();
        outboxes.push(down_tx);
        workers.push(ChannelWorkerLink {
            id,
            outbox: up_tx.clone(),
            inbox: down_rx,
        });
    }
    (
        ChannelCoordinatorLink {
            inbox: up_rx,
            outboxes,
        },
        workers,
    )
}

impl CoordinatorLink for ChannelCoordinatorLink {
    fn worker_count(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&mut self, worker: usize, frame: Vec<u8>) -> Result<()> {
        let outbox = self
            .outboxes
            .get(worker)
            .ok_or_else(|| Error::Config(format!("no worker {worker}")))?;
        outbox.send(frame).map_err(|_| Error::Disconnected)
    }

    fn try_recv(&mut self) -> Result<Option<Incoming>> {
        match self.inbox.try_recv() {
            Ok(incoming) => Ok(Some(incoming)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::Disconnected),
        }
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Incoming>> {
        match self.inbox.recv_timeout(timeout) {
            Ok(incoming) => Ok(Some(incoming)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Disconnected),
        }
    }
}

impl WorkerLink for ChannelWorkerLink {
    fn send(&mut self, frame: Vec<u8>) -> Result<()> {
        self.outbox
            .send((self.id, frame))
            .map_err(|_| Error::Disconnected)
    }

    fn recv(&mut self) -> Result<Vec<u8>> {
        self.inbox.recv().map_err(|_| Error::Disconnected)
    }

    fn try_recv(&mut self) -> Result<Option<Vec<u8>>> {
        match self.inbox.try_recv() {
            Ok(frame) => Ok(Some(frame)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::Disconnected),
        }
    }
}
