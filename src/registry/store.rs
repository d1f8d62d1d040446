//! Socket registry implementation

use std::collections::HashMap;

use super::socket_type::{Domain, Protocol, SocketType};
use crate::error::{Error, Result};
use crate::fanout::Filtering;
use crate::socket::{Socket, SocketConfig};

/// Socket types that ship with the crate
pub const DEFAULT_TYPES: [SocketType; 4] = [
    SocketType::new(Domain::Cooked, Protocol::Pub, Filtering::PerPeerTrie, Protocol::Sub),
    SocketType::new(Domain::Cooked, Protocol::Sub, Filtering::Unfiltered, Protocol::Pub),
    SocketType::new(Domain::Raw, Protocol::SubBus, Filtering::SharedTrie, Protocol::SubBus),
    SocketType::new(Domain::Cooked, Protocol::SubBus, Filtering::SharedTrie, Protocol::SubBus),
];

/// Lookup table from `(Domain, Protocol)` to socket type
#[derive(Debug, Clone, Default)]
pub struct SocketRegistry {
    types: HashMap<(Domain, Protocol), SocketType>,
}

impl SocketRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in socket types
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for ty in DEFAULT_TYPES {
            registry.register(ty);
        }
        registry
    }

    /// Add or replace a socket type, returning the one it replaced
    pub fn register(&mut self, ty: SocketType) -> Option<SocketType> {
        self.types.insert((ty.domain, ty.protocol), ty)
    }

    /// Number of registered socket types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Socket type for a `(domain, protocol)` pair
    pub fn lookup(&self, domain: Domain, protocol: Protocol) -> Result<&SocketType> {
        self.types
            .get(&(domain, protocol))
            .ok_or(Error::UnsupportedSocketType)
    }

    /// Whether a socket speaking `protocol` accepts peers speaking `other`
    pub fn is_peer(&self, protocol: Protocol, other: Protocol) -> bool {
        self.types
            .values()
            .any(|ty| ty.protocol == protocol && ty.accepts_peer(other))
    }

    /// Build a socket of the registered type
    pub fn create(
        &self,
        domain: Domain,
        protocol: Protocol,
        config: SocketConfig,
    ) -> Result<Socket> {
        let ty = *self.lookup(domain, protocol)?;
        let socket = Socket::new(ty, config);

        tracing::info!(
            socket_type = %ty,
            filtering = ?socket.engine().config().filtering,
            "Socket created"
        );

        Ok(socket)
    }
}
