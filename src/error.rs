//! Error types
//!
//! Misuse of the API is reported through [`Error`]. Protocol errors coming
//! from peers (malformed frames, congestion) are recovered locally and never
//! surface here.

use crate::pipe::PipeId;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for socket and engine operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Receive priority outside of 1..=16
    InvalidPriority(u8),
    /// The pipe is not attached to this socket
    PipeNotAttached(PipeId),
    /// Routing header of an unexpected length (in bytes)
    InvalidHeader(usize),
    /// A filtering socket cannot send a message without a discriminator byte
    EmptyMessage,
    /// No message is ready to be received
    WouldBlock,
    /// No socket type registered for the requested domain/protocol
    UnsupportedSocketType,
    /// Unsubscribe for a topic that is not currently subscribed
    NotSubscribed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidPriority(prio) => {
                write!(f, "Invalid receive priority {} (expected 1..=16)", prio)
            }
            Error::PipeNotAttached(id) => write!(f, "Pipe not attached: {}", id),
            Error::InvalidHeader(len) => write!(f, "Invalid routing header length: {}", len),
            Error::EmptyMessage => write!(f, "Message has no discriminator byte"),
            Error::WouldBlock => write!(f, "Operation would block"),
            Error::UnsupportedSocketType => write!(f, "Unsupported socket type"),
            Error::NotSubscribed => write!(f, "Topic is not subscribed"),
        }
    }
}

impl std::error::Error for Error {}
