//! Messages and the in-band control protocol
//!
//! A [`Message`] is an opaque body plus an optional routing header. Both are
//! `bytes::Bytes`, so fanning a message out to many pipes only bumps
//! reference counts.
//!
//! The first byte of the body tells data apart from subscription control:
//!
//! ```text
//!   'M' <topic+payload...>   data, matched against subscriptions
//!   'S' <topic>              subscribe the sending pipe to <topic>
//!   'U' <topic>              unsubscribe the sending pipe from <topic>
//! ```

pub mod control;
pub mod frame;

pub use control::{FrameKind, TopicFraming, DATA, SUBSCRIBE, UNSUBSCRIBE};
pub use frame::{Message, ROUTING_HEADER_LEN};
