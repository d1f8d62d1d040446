//! Fan-out engine
//!
//! Ties the attached pipes, the inbound fair queue, the outbound distributor
//! and the subscription tries together. One [`FanoutEngine`] backs one
//! socket; it is driven entirely through `&mut self` and never blocks.

pub mod config;
pub mod egress;
mod engine;
pub mod ingress;
mod record;

pub use config::{EngineConfig, Filtering, MatchScope};
pub use egress::Distributor;
pub use engine::{Events, FanoutEngine, Received};
pub use ingress::FairQueue;
