//! Fan-out engine
//!
//! Owns the attached pipes and routes messages between them and the user:
//! inbound through the priority fair queue, outbound through the
//! distributor, filtered by the subscription tries according to
//! [`Filtering`].

use std::collections::HashMap;

use bytes::Bytes;

use super::config::{EngineConfig, Filtering, MatchScope};
use super::egress::Distributor;
use super::ingress::FairQueue;
use super::record::PipeRecord;
use crate::error::{Error, Result};
use crate::message::{FrameKind, Message};
use crate::pipe::{Pipe, PipeId, Priority, SendOutcome};
use crate::stats::EngineStats;
use crate::trie::{Delivery, Subscribed, TopicTrie, Unsubscribed};

/// A message handed to the user together with the pipe it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub msg: Message,
    pub pipe: PipeId,
}

/// Readiness summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Events {
    /// At least one pipe is in the inbound rotation
    pub readable: bool,
    /// At least one pipe can take outbound messages
    pub writable: bool,
}

/// Routing core of one socket
#[derive(Debug)]
pub struct FanoutEngine {
    config: EngineConfig,
    pipes: HashMap<PipeId, PipeRecord>,
    ingress: FairQueue,
    egress: Distributor,
    /// Subscriptions of every pipe when filtering through a shared trie
    trie: TopicTrie,
    next_pipe_id: u64,
    stats: EngineStats,
}

impl FanoutEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            pipes: HashMap::new(),
            ingress: FairQueue::new(),
            egress: Distributor::new(),
            trie: TopicTrie::new(),
            next_pipe_id: 1,
            stats: EngineStats::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Number of attached pipes
    pub fn pipe_count(&self) -> usize {
        self.pipes.len()
    }

    pub fn is_attached(&self, id: PipeId) -> bool {
        self.pipes.contains_key(&id)
    }

    /// Shared subscription trie (empty unless filtering through it)
    pub fn shared_trie(&self) -> &TopicTrie {
        &self.trie
    }

    /// Private trie of `id` when filtering per peer
    pub fn peer_trie(&self, id: PipeId) -> Option<&TopicTrie> {
        self.pipes.get(&id).and_then(|record| record.trie.as_ref())
    }

    /// Topics `id` is subscribed to, with multiplicity, in byte order
    pub fn subscriptions(&self, id: PipeId) -> Result<Vec<(Bytes, u32)>> {
        self.pipes
            .get(&id)
            .map(PipeRecord::subscriptions)
            .ok_or(Error::PipeNotAttached(id))
    }

    /// Take ownership of a connected pipe
    ///
    /// The pipe starts out both readable and writable.
    pub fn attach(&mut self, pipe: Box<dyn Pipe>) -> Result<PipeId> {
        let priority = Priority::new(pipe.priority())?;

        let id = PipeId::from_raw(self.next_pipe_id);
        self.next_pipe_id += 1;

        let trie = (self.config.filtering == Filtering::PerPeerTrie).then(TopicTrie::new);
        self.pipes.insert(id, PipeRecord::new(pipe, priority, trie));
        self.ingress.register(id, priority);
        self.egress.mark_writable(id);
        self.stats.attached_pipes = self.pipes.len();

        tracing::info!(pipe = %id, priority = priority.get(), "Pipe attached");
        Ok(id)
    }

    /// Remove a pipe and every subscription it holds, handing it back
    pub fn detach(&mut self, id: PipeId) -> Result<Box<dyn Pipe>> {
        let mut record = self.pipes.remove(&id).ok_or(Error::PipeNotAttached(id))?;

        self.ingress.unregister(id);
        self.egress.release(id);

        let held = record.take_subscriptions();
        if record.trie.is_none() {
            for (topic, count) in &held {
                for _ in 0..*count {
                    self.trie.unsubscribe(id, topic);
                }
            }
        }
        self.stats.attached_pipes = self.pipes.len();

        tracing::info!(pipe = %id, subscriptions = held.len(), "Pipe detached");
        Ok(record.pipe)
    }

    /// The transport has inbound data queued on `id`
    pub fn readable(&mut self, id: PipeId) -> Result<()> {
        if !self.pipes.contains_key(&id) {
            return Err(Error::PipeNotAttached(id));
        }
        self.ingress.mark_readable(id);
        Ok(())
    }

    /// `id` can take outbound messages again
    pub fn writable(&mut self, id: PipeId) -> Result<()> {
        if !self.pipes.contains_key(&id) {
            return Err(Error::PipeNotAttached(id));
        }
        if self.egress.mark_writable(id) {
            tracing::trace!(pipe = %id, "Pipe rejoined fan-out");
        }
        Ok(())
    }

    pub fn events(&self) -> Events {
        Events {
            readable: self.ingress.can_recv(),
            writable: self.egress.can_send(),
        }
    }

    /// Subscribe `id` to `topic`
    pub fn subscribe(&mut self, id: PipeId, topic: Bytes) -> Result<Subscribed> {
        let record = self.pipes.get_mut(&id).ok_or(Error::PipeNotAttached(id))?;

        let outcome = match record.trie.as_mut() {
            Some(trie) => trie.subscribe(id, &topic),
            None => self.trie.subscribe(id, &topic),
        };
        tracing::debug!(pipe = %id, topic = ?topic, ?outcome, "Subscribed");
        record.note_subscribe(topic);
        Ok(outcome)
    }

    /// Drop one subscription of `id` to `topic`
    pub fn unsubscribe(&mut self, id: PipeId, topic: &[u8]) -> Result<Unsubscribed> {
        let record = self.pipes.get_mut(&id).ok_or(Error::PipeNotAttached(id))?;

        let outcome = match record.trie.as_mut() {
            Some(trie) => trie.unsubscribe(id, topic),
            None => self.trie.unsubscribe(id, topic),
        };
        if outcome == Unsubscribed::NotFound {
            return Err(Error::NotSubscribed);
        }
        record.note_unsubscribe(topic);
        tracing::debug!(
            pipe = %id,
            topic = ?Bytes::copy_from_slice(topic),
            ?outcome,
            "Unsubscribed"
        );
        Ok(outcome)
    }

    /// Route an outbound message to the pipes that should see it
    ///
    /// `exclude` never receives a copy. A data message nobody subscribed to
    /// is dropped without error.
    pub fn send(&mut self, msg: Message, exclude: Option<PipeId>) -> Result<Delivery> {
        let filtering = self.config.filtering;
        if !filtering.is_filtering() {
            let delivery = self.egress.broadcast(msg, exclude, deliver(&mut self.pipes));
            return Ok(self.finish_send(delivery));
        }

        let topic = match msg.kind(self.config.topic_framing) {
            FrameKind::Empty => return Err(Error::EmptyMessage),
            FrameKind::Data(topic) => topic,
            _ => {
                let delivery = self.egress.broadcast(msg, exclude, deliver(&mut self.pipes));
                return Ok(self.finish_send(delivery));
            }
        };

        let targets: Vec<PipeId> = match filtering {
            Filtering::PerPeerTrie => {
                let pipes = &self.pipes;
                self.egress
                    .writable()
                    .filter(|id| {
                        pipes
                            .get(id)
                            .and_then(|record| record.trie.as_ref())
                            .map_or(false, |trie| trie.match_topic(&topic).is_some())
                    })
                    .collect()
            }
            _ => shared_targets(&self.trie, &topic, self.config.match_scope),
        };

        if targets.is_empty() {
            tracing::trace!(topic = ?topic, "No subscription matched, message dropped");
            self.stats.record_no_match();
            return Ok(Delivery::default());
        }

        let delivery = self
            .egress
            .send_to(targets, msg, exclude, deliver(&mut self.pipes));
        Ok(self.finish_send(delivery))
    }

    /// Next data message from the fair queue, applying control frames on
    /// the way
    pub fn recv(&mut self) -> Option<Received> {
        loop {
            let pipes = &mut self.pipes;
            let (msg, pipe) = self
                .ingress
                .pull(|id| pipes.get_mut(&id).and_then(|record| record.pipe.recv()))?;

            if msg.has_header() {
                tracing::warn!(
                    pipe = %pipe,
                    len = msg.header().len(),
                    "Inbound message already routed, dropped"
                );
                self.stats.malformed_dropped += 1;
                continue;
            }

            if !self.config.filtering.is_filtering() {
                return Some(self.finish_recv(msg, pipe));
            }

            match msg.kind(self.config.topic_framing) {
                FrameKind::Data(_) => return Some(self.finish_recv(msg, pipe)),
                FrameKind::Subscribe(topic) => {
                    if self.subscribe(pipe, topic).is_ok() {
                        self.stats.control_frames += 1;
                    }
                }
                FrameKind::Unsubscribe(topic) => match self.unsubscribe(pipe, &topic) {
                    Ok(_) => self.stats.control_frames += 1,
                    Err(e) => {
                        tracing::warn!(
                            pipe = %pipe,
                            topic = ?topic,
                            error = %e,
                            "Peer unsubscribed from unknown topic"
                        );
                        self.stats.malformed_dropped += 1;
                    }
                },
                FrameKind::Unknown(op) => {
                    tracing::warn!(pipe = %pipe, op, "Unknown frame discriminator, dropped");
                    self.stats.malformed_dropped += 1;
                }
                FrameKind::Empty => {
                    tracing::warn!(pipe = %pipe, "Empty frame, dropped");
                    self.stats.malformed_dropped += 1;
                }
            }
        }
    }

    fn finish_send(&mut self, delivery: Delivery) -> Delivery {
        tracing::trace!(
            recipients = delivery.recipients,
            released = delivery.released,
            "Message fanned out"
        );
        self.stats.record_delivery(&delivery);
        delivery
    }

    fn finish_recv(&mut self, msg: Message, pipe: PipeId) -> Received {
        tracing::trace!(pipe = %pipe, len = msg.len(), "Message received");
        self.stats.messages_received += 1;
        Received { msg, pipe }
    }
}

/// Send callback writing into the attached pipe with the given id
fn deliver(
    pipes: &mut HashMap<PipeId, PipeRecord>,
) -> impl FnMut(PipeId, Message) -> SendOutcome + '_ {
    move |id, msg| match pipes.get_mut(&id) {
        Some(record) => record.pipe.send(msg),
        None => SendOutcome::Congested,
    }
}

fn shared_targets(trie: &TopicTrie, topic: &[u8], scope: MatchScope) -> Vec<PipeId> {
    match scope {
        MatchScope::Longest => trie
            .match_topic(topic)
            .map(|set| set.iter().collect())
            .unwrap_or_default(),
        MatchScope::AllPrefixes => {
            let mut out = Vec::new();
            for set in trie.match_all(topic) {
                for pipe in set.iter() {
                    if !out.contains(&pipe) {
                        out.push(pipe);
                    }
                }
            }
            out
        }
    }
}
