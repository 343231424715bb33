//! Error types for the engine crate.

use std::io;

use thiserror::Error;

/// Errors raised by state parsing, the wire protocol and the transports.
///
/// Search itself never fails with this type; cancellation is reported through
/// [`crate::search::Cancelled`].
#[derive(Debug, Error)]
pub enum Error {
    /// A board state string or snapshot could not be parsed.
    #[error("invalid board state: {0}")]
    InvalidState(String),

    /// A frame did not match the message layout.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer on the other side of a link went away.
    #[error("link disconnected")]
    Disconnected,

    /// Socket or stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Rejected option value.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
