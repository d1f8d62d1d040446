//! Socket type descriptors

use std::fmt;

use crate::fanout::Filtering;

/// Whether a socket exposes routing headers to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Headers are hidden; sends must not carry one
    Cooked,
    /// Received messages are stamped with their source pipe and sends may
    /// name a pipe to exclude
    Raw,
}

/// Messaging pattern spoken on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Pub,
    Sub,
    SubBus,
}

impl Protocol {
    /// Human-readable protocol name
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Pub => "pub",
            Protocol::Sub => "sub",
            Protocol::SubBus => "subbus",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Cooked => write!(f, "cooked"),
            Domain::Raw => write!(f, "raw"),
        }
    }
}

/// How sockets of one type behave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketType {
    pub domain: Domain,
    pub protocol: Protocol,
    /// Filtering applied unless the socket config overrides it
    pub filtering: Filtering,
    /// Protocol a connected peer must speak
    pub peer: Protocol,
}

impl SocketType {
    pub const fn new(
        domain: Domain,
        protocol: Protocol,
        filtering: Filtering,
        peer: Protocol,
    ) -> Self {
        Self {
            domain,
            protocol,
            filtering,
            peer,
        }
    }

    pub fn is_raw(&self) -> bool {
        self.domain == Domain::Raw
    }

    /// Whether a socket of this type may talk to one speaking `other`
    pub fn accepts_peer(&self, other: Protocol) -> bool {
        self.peer == other
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.protocol, self.domain)
    }
}
