//! Routing sockets
//!
//! A [`Socket`] is a [`FanoutEngine`](crate::fanout::FanoutEngine) plus the
//! header rules of its [`Domain`](crate::registry::Domain). Sockets are
//! normally built through [`SocketRegistry::create`](crate::registry::SocketRegistry::create).

pub mod config;
pub mod router;

pub use config::SocketConfig;
pub use router::Socket;
