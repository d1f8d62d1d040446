//! Socket type registry
//!
//! Maps a `(Domain, Protocol)` pair to the [`SocketType`] that describes how
//! such a socket filters traffic and which protocol its peers must speak.
//!
//! ```text
//!   protocol  domain   filtering      peer
//!   ────────  ──────   ───────────    ──────
//!   Pub       cooked   PerPeerTrie    Sub
//!   Sub       cooked   Unfiltered     Pub
//!   SubBus    raw      SharedTrie     SubBus
//!   SubBus    cooked   SharedTrie     SubBus
//! ```
//!
//! The registry is an ordinary value built at startup; nothing is global.

pub mod socket_type;
pub mod store;

pub use socket_type::{Domain, Protocol, SocketType};
pub use store::SocketRegistry;
