//! Distributed search: one coordinator, any number of workers.
//!
//! The coordinator and the workers share no memory. They exchange the frames
//! of [`protocol`] over a [`transport`] link, in-process or over TCP, and
//! every job carries its own board snapshot.

pub mod branch;
pub mod coordinator;
pub mod job;
pub mod local;
pub mod protocol;
pub mod tcp;
pub mod transport;
pub mod worker;

pub use coordinator::{Coordinator, RoundSummary};
pub use local::{LocalCluster, LocalCoordinator, spawn_engine};
pub use worker::{Worker, WorkerStats};
