//! Topic routing for pub/sub and subscription-bus sockets
//!
//! The crate is the routing core of a message transport: it decides which
//! connected peers get a copy of each outbound message, and interprets the
//! subscribe/unsubscribe frames peers send in-band.
//!
//! # Architecture
//!
//! ```text
//!                SocketRegistry::create(domain, protocol, config)
//!                               │
//!                               ▼
//!   ┌──────────────────────── Socket ─────────────────────────┐
//!   │  raw/cooked header rules                                │
//!   │  ┌─────────────────── FanoutEngine ──────────────────┐  │
//!   │  │  FairQueue (ingress)     Distributor (egress)     │  │
//!   │  │        │                        ▲                 │  │
//!   │  │   'S'/'U' ──► TopicTrie ──► match 'M' topic       │  │
//!   │  └───────────────────────────────────────────────────┘  │
//!   └─────────┬──────────────────┬──────────────────┬─────────┘
//!          [Pipe]             [Pipe]             [Pipe]
//! ```
//!
//! # Example
//!
//! ```no_run
//! use subbus_rs::{Domain, Message, Protocol, SocketConfig, SocketRegistry};
//!
//! # async fn run() -> subbus_rs::Result<()> {
//! let registry = SocketRegistry::with_defaults();
//! let mut broker = registry.create(Domain::Raw, Protocol::SubBus, SocketConfig::default())?;
//!
//! let (_id, peer) = broker.connect()?;
//! peer.send(Message::subscribe(b"news.")).await.ok();
//!
//! // Applies the subscription; nothing to hand to the user yet
//! assert!(broker.recv().is_err());
//! broker.send(Message::data(b"news.weather sunny"))?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod fanout;
pub mod message;
pub mod pipe;
pub mod registry;
pub mod socket;
pub mod stats;
pub mod trie;

pub use error::{Error, Result};
pub use fanout::{EngineConfig, Events, FanoutEngine, Filtering, MatchScope, Received};
pub use message::{FrameKind, Message, TopicFraming};
pub use pipe::{channel_pipe, ChannelPipe, PeerEndpoint, Pipe, PipeId, Priority, SendOutcome};
pub use registry::{Domain, Protocol, SocketRegistry, SocketType};
pub use socket::{Socket, SocketConfig};
pub use stats::EngineStats;
pub use trie::{Delivery, SubscriberSet, TopicTrie};
