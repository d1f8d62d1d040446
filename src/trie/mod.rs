//! Topic subscription trie
//!
//! A refcounted patricia trie keyed on topic bytes. Every node where a
//! subscription ends carries the [`SubscriberSet`] of pipes holding it.
//!
//! # Layout
//!
//! ```text
//!   subscribe "foo", "foobar", "fox"
//!
//!   root ""
//!    └─'f'─ [o]            refcount 0, two children
//!            ├─'o'─ []     "foo"     refcount 1
//!            │       └─'b'─ [ar]     "foobar" refcount 1
//!            └─'x'─ []     "fox"     refcount 1
//! ```
//!
//! Each node stores up to [`PREFIX_MAX`] bytes inline; longer runs are
//! chained across nodes. Branch tables start sparse and turn dense once more
//! than [`SPARSE_MAX`] children hang off one node.

mod node;
pub mod store;
pub mod subscribers;

pub use node::{PREFIX_MAX, SPARSE_MAX};
pub use store::{Matches, Subscribed, TopicTrie, Unsubscribed};
pub use subscribers::{Delivery, SubscriberSet};
