//! Fan-out engine configuration

use crate::message::TopicFraming;

/// Where inbound subscriptions are recorded and how outbound data is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filtering {
    /// Every peer has its own trie; data goes to each peer whose trie matches
    PerPeerTrie,
    /// One trie for the whole socket; data goes to the matched subscriber set
    SharedTrie,
    /// No filtering: every message goes to every writable peer
    Unfiltered,
}

impl Filtering {
    /// Whether inbound `'S'`/`'U'` frames are interpreted
    pub fn is_filtering(self) -> bool {
        !matches!(self, Filtering::Unfiltered)
    }
}

/// Which subscriptions a data topic is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchScope {
    /// Only the longest subscribed prefix of the topic
    #[default]
    Longest,
    /// Every subscribed prefix of the topic, each pipe receiving one copy
    AllPrefixes,
}

/// Routing options of one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub filtering: Filtering,
    pub topic_framing: TopicFraming,
    pub match_scope: MatchScope,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            filtering: Filtering::SharedTrie,
            topic_framing: TopicFraming::default(),
            match_scope: MatchScope::default(),
        }
    }
}

impl EngineConfig {
    /// Config with the given filtering mode and default matching
    pub fn with_filtering(filtering: Filtering) -> Self {
        Self {
            filtering,
            ..Default::default()
        }
    }

    /// Set the topic framing of control frames
    pub fn topic_framing(mut self, framing: TopicFraming) -> Self {
        self.topic_framing = framing;
        self
    }

    /// Set the match scope
    pub fn match_scope(mut self, scope: MatchScope) -> Self {
        self.match_scope = scope;
        self
    }
}
