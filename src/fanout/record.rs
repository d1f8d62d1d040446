//! Per-pipe bookkeeping owned by the engine

use std::collections::HashMap;

use bytes::Bytes;

use crate::pipe::{Pipe, Priority};
use crate::trie::TopicTrie;

/// Everything the engine knows about one attached pipe
pub(crate) struct PipeRecord {
    pub(crate) pipe: Box<dyn Pipe>,
    pub(crate) priority: Priority,
    /// Topics this pipe subscribed to, with multiplicity
    ledger: HashMap<Bytes, u32>,
    /// Private trie when filtering per peer
    pub(crate) trie: Option<TopicTrie>,
}

impl std::fmt::Debug for PipeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeRecord")
            .field("priority", &self.priority)
            .field("subscriptions", &self.ledger.len())
            .field("private_trie", &self.trie.is_some())
            .finish()
    }
}

impl PipeRecord {
    pub(crate) fn new(pipe: Box<dyn Pipe>, priority: Priority, trie: Option<TopicTrie>) -> Self {
        Self {
            pipe,
            priority,
            ledger: HashMap::new(),
            trie,
        }
    }

    pub(crate) fn note_subscribe(&mut self, topic: Bytes) {
        *self.ledger.entry(topic).or_insert(0) += 1;
    }

    /// Returns `false` if the pipe held no subscription to `topic`
    pub(crate) fn note_unsubscribe(&mut self, topic: &[u8]) -> bool {
        match self.ledger.get_mut(topic) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.ledger.remove(topic);
                true
            }
            None => false,
        }
    }

    /// Subscriptions in byte order of topic
    pub(crate) fn subscriptions(&self) -> Vec<(Bytes, u32)> {
        let mut out: Vec<_> = self
            .ledger
            .iter()
            .map(|(topic, count)| (topic.clone(), *count))
            .collect();
        out.sort();
        out
    }

    /// Empty the ledger, returning what it held
    pub(crate) fn take_subscriptions(&mut self) -> HashMap<Bytes, u32> {
        std::mem::take(&mut self.ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::mock::MockPipe;

    fn record() -> PipeRecord {
        let (pipe, _handle) = MockPipe::new();
        PipeRecord::new(Box::new(pipe), Priority::default(), None)
    }

    #[test]
    fn test_ledger_multiplicity() {
        let mut rec = record();
        rec.note_subscribe(Bytes::from_static(b"foo"));
        rec.note_subscribe(Bytes::from_static(b"foo"));
        rec.note_subscribe(Bytes::from_static(b"bar"));

        assert_eq!(
            rec.subscriptions(),
            vec![
                (Bytes::from_static(b"bar"), 1),
                (Bytes::from_static(b"foo"), 2)
            ]
        );

        assert!(rec.note_unsubscribe(b"foo"));
        assert!(rec.note_unsubscribe(b"foo"));
        assert!(!rec.note_unsubscribe(b"foo"));
        assert_eq!(rec.take_subscriptions().len(), 1);
        assert!(rec.subscriptions().is_empty());
    }
}
