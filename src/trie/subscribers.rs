//! Subscriber sets
//!
//! A [`SubscriberSet`] holds each pipe at most once, in insertion order, with
//! a per-pipe reference count so that a pipe subscribing twice to the same
//! topic has to unsubscribe twice before it leaves the set.

use crate::message::Message;
use crate::pipe::{PipeId, SendOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Member {
    pipe: PipeId,
    refs: u32,
}

/// Outcome of one fan-out pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Pipes that accepted a copy
    pub recipients: usize,
    /// Pipes released from fan-out because they reported congestion
    pub released: usize,
}

impl Delivery {
    /// Whether nobody received the message
    pub fn is_dropped(&self) -> bool {
        self.recipients == 0
    }
}

/// Ordered set of pipe handles
#[derive(Debug, Clone, Default)]
pub struct SubscriberSet {
    members: Vec<Member>,
}

impl SubscriberSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct pipes
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the set has no pipes
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether `pipe` is a member
    pub fn contains(&self, pipe: PipeId) -> bool {
        self.position(pipe).is_some()
    }

    /// Number of references `pipe` holds (0 if absent)
    pub fn refs(&self, pipe: PipeId) -> u32 {
        self.position(pipe)
            .map(|idx| self.members[idx].refs)
            .unwrap_or(0)
    }

    /// Sum of references over all members
    pub fn total_refs(&self) -> u32 {
        self.members.iter().map(|m| m.refs).sum()
    }

    /// Iterate over member pipes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = PipeId> + '_ {
        self.members.iter().map(|m| m.pipe)
    }

    /// Add one reference for `pipe`
    ///
    /// Returns `true` if the pipe was not a member before.
    pub fn add(&mut self, pipe: PipeId) -> bool {
        match self.position(pipe) {
            Some(idx) => {
                self.members[idx].refs += 1;
                false
            }
            None => {
                self.members.push(Member { pipe, refs: 1 });
                true
            }
        }
    }

    /// Drop one reference held by `pipe`
    ///
    /// The pipe leaves the set when its last reference goes. Returns `false`
    /// if the pipe was not a member.
    pub fn remove(&mut self, pipe: PipeId) -> bool {
        let Some(idx) = self.position(pipe) else {
            return false;
        };

        if self.members[idx].refs > 1 {
            self.members[idx].refs -= 1;
        } else {
            self.members.remove(idx);
        }
        true
    }

    /// Remove `pipe` regardless of how many references it holds
    pub fn evict(&mut self, pipe: PipeId) -> bool {
        match self.position(pipe) {
            Some(idx) => {
                self.members.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Remove the member at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    pub fn remove_at(&mut self, index: usize) -> PipeId {
        self.members.remove(index).pipe
    }

    /// Send a copy of `msg` to every member except `exclude`
    ///
    /// Members whose send reports congestion are removed from the set and
    /// the pass continues with the rest.
    pub fn distribute<F>(&mut self, msg: Message, exclude: Option<PipeId>, mut send: F) -> Delivery
    where
        F: FnMut(PipeId, Message) -> SendOutcome,
    {
        let mut delivery = Delivery::default();
        let mut idx = 0;

        while idx < self.members.len() {
            let pipe = self.members[idx].pipe;
            if Some(pipe) == exclude {
                idx += 1;
                continue;
            }

            match send(pipe, msg.clone()) {
                SendOutcome::Sent => {
                    delivery.recipients += 1;
                    idx += 1;
                }
                SendOutcome::Congested => {
                    self.remove_at(idx);
                    delivery.released += 1;
                }
            }
        }

        delivery
    }

    fn position(&self, pipe: PipeId) -> Option<usize> {
        self.members.iter().position(|m| m.pipe == pipe)
    }
}
