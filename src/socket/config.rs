//! Socket configuration

use crate::fanout::{EngineConfig, Filtering, MatchScope};
use crate::message::TopicFraming;
use crate::pipe::PRIORITY_DEFAULT;
use crate::registry::SocketType;

/// Socket configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketConfig {
    /// Filtering override (None = the socket type's own)
    pub filtering: Option<Filtering>,

    /// Delimiting of subscribe/unsubscribe topics
    pub topic_framing: TopicFraming,

    /// Which subscribed prefixes a data topic is delivered through
    pub match_scope: MatchScope,

    /// Receive priority of pipes created by the socket
    pub default_priority: u8,

    /// Queue depth of in-process channel pipes, per direction
    pub channel_capacity: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            filtering: None,
            topic_framing: TopicFraming::NulTerminated,
            match_scope: MatchScope::Longest,
            default_priority: PRIORITY_DEFAULT,
            channel_capacity: 64,
        }
    }
}

impl SocketConfig {
    /// Override the filtering mode of the socket type
    pub fn filtering(mut self, filtering: Filtering) -> Self {
        self.filtering = Some(filtering);
        self
    }

    /// Set topic framing
    pub fn topic_framing(mut self, framing: TopicFraming) -> Self {
        self.topic_framing = framing;
        self
    }

    /// Set match scope
    pub fn match_scope(mut self, scope: MatchScope) -> Self {
        self.match_scope = scope;
        self
    }

    /// Set the receive priority of pipes created by the socket
    ///
    /// Validated when a pipe is created.
    pub fn default_priority(mut self, priority: u8) -> Self {
        self.default_priority = priority;
        self
    }

    /// Set channel capacity (at least 1)
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Engine options for a socket of type `ty`
    pub fn engine_config(&self, ty: &SocketType) -> EngineConfig {
        EngineConfig::with_filtering(self.filtering.unwrap_or(ty.filtering))
            .topic_framing(self.topic_framing)
            .match_scope(self.match_scope)
    }
}
