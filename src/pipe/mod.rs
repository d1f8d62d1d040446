//! Peer pipes
//!
//! A pipe is one connected peer endpoint. Pipes are owned by the transport
//! layer; the routing core only sees them through the [`Pipe`] trait and
//! refers to them by [`PipeId`].

pub mod channel;
#[cfg(test)]
pub(crate) mod mock;

pub use channel::{channel_pipe, ChannelPipe, PeerEndpoint};

use crate::error::{Error, Result};
use crate::message::Message;

/// Opaque pipe handle, compared by identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PipeId(u64);

impl PipeId {
    /// Build a handle from its raw 64-bit value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw 64-bit value (what goes into routing headers)
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PipeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pipe#{}", self.0)
    }
}

/// Most preferred receive priority
pub const PRIORITY_HIGHEST: u8 = 1;
/// Least preferred receive priority
pub const PRIORITY_LOWEST: u8 = 16;
/// Receive priority used when none is configured
pub const PRIORITY_DEFAULT: u8 = 8;

/// Validated receive priority. Lower values are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(u8);

impl Priority {
    /// Validate a raw priority value
    pub fn new(value: u8) -> Result<Self> {
        if (PRIORITY_HIGHEST..=PRIORITY_LOWEST).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidPriority(value))
        }
    }

    /// Raw value
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot index, 0 being the most preferred
    pub(crate) fn index(self) -> usize {
        usize::from(self.0 - PRIORITY_HIGHEST)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(PRIORITY_DEFAULT)
    }
}

/// Result of handing a message to a pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Message queued for the peer
    Sent,
    /// The pipe cannot take more; release it from fan-out until writable
    Congested,
}

/// Contract the routing core needs from a connected peer
pub trait Pipe: Send {
    /// Receive priority, validated on attach
    fn priority(&self) -> u8;

    /// Hand a copy of a message to the peer's outbound queue
    fn send(&mut self, msg: Message) -> SendOutcome;

    /// Take the next inbound message, if one is queued
    fn recv(&mut self) -> Option<Message>;
}
