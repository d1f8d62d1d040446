//! Socket front end over the fan-out engine
//!
//! Adds the raw/cooked header handling on top of [`FanoutEngine`]: raw
//! sockets see the source pipe of every received message in its routing
//! header and can name a pipe to skip when sending; cooked sockets never see
//! a header.

use bytes::Bytes;

use super::config::SocketConfig;
use crate::error::{Error, Result};
use crate::fanout::{Events, FanoutEngine, Received};
use crate::message::{FrameKind, Message};
use crate::pipe::{channel_pipe, PeerEndpoint, Pipe, PipeId};
use crate::registry::{Protocol, SocketType};
use crate::stats::EngineStats;
use crate::trie::{Delivery, TopicTrie, Unsubscribed};

/// Owner recorded for subscriptions a socket makes itself
const LOCAL: PipeId = PipeId::from_raw(0);

/// A routing socket of one registered type
#[derive(Debug)]
pub struct Socket {
    socket_type: SocketType,
    config: SocketConfig,
    engine: FanoutEngine,
    /// Subscriptions this socket has sent upstream
    local: TopicTrie,
}

impl Socket {
    pub fn new(socket_type: SocketType, config: SocketConfig) -> Self {
        let engine = FanoutEngine::new(config.engine_config(&socket_type));
        Self {
            socket_type,
            config,
            engine,
            local: TopicTrie::new(),
        }
    }

    pub fn socket_type(&self) -> &SocketType {
        &self.socket_type
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn engine(&self) -> &FanoutEngine {
        &self.engine
    }

    pub fn stats(&self) -> &EngineStats {
        self.engine.stats()
    }

    /// Attach a connected pipe
    pub fn attach(&mut self, pipe: Box<dyn Pipe>) -> Result<PipeId> {
        self.engine.attach(pipe)
    }

    /// Create an in-process pipe at the configured default priority and
    /// attach it, returning the peer side
    pub fn connect(&mut self) -> Result<(PipeId, PeerEndpoint)> {
        self.connect_with_priority(self.config.default_priority)
    }

    /// Like [`connect`](Self::connect) with an explicit receive priority
    pub fn connect_with_priority(&mut self, priority: u8) -> Result<(PipeId, PeerEndpoint)> {
        let (pipe, peer) = channel_pipe(self.config.channel_capacity, priority);
        let id = self.engine.attach(Box::new(pipe))?;
        Ok((id, peer))
    }

    pub fn detach(&mut self, id: PipeId) -> Result<Box<dyn Pipe>> {
        self.engine.detach(id)
    }

    pub fn readable(&mut self, id: PipeId) -> Result<()> {
        self.engine.readable(id)
    }

    pub fn writable(&mut self, id: PipeId) -> Result<()> {
        self.engine.writable(id)
    }

    pub fn events(&self) -> Events {
        self.engine.events()
    }

    /// Topics this socket subscribed to through [`send`](Self::send)
    pub fn subscriptions(&self) -> Vec<(Vec<u8>, u32)> {
        self.local.topics()
    }

    /// Send a message to the attached peers
    ///
    /// On a raw socket an 8-byte routing header names a pipe that must not
    /// get a copy. Cooked sockets reject any header.
    pub fn send(&mut self, mut msg: Message) -> Result<Delivery> {
        let exclude = if self.socket_type.is_raw() {
            let exclude = msg.routing_id()?;
            msg.take_header();
            exclude
        } else {
            if msg.has_header() {
                return Err(Error::InvalidHeader(msg.header().len()));
            }
            None
        };

        if self.socket_type.protocol == Protocol::Sub {
            self.track_local(&msg)?;
        }

        self.engine.send(msg, exclude)
    }

    /// Receive the next message
    ///
    /// Raw sockets get the source pipe stamped into the routing header.
    /// Returns [`Error::WouldBlock`] when nothing is ready.
    pub fn recv(&mut self) -> Result<Message> {
        self.recv_from().map(|received| received.msg)
    }

    /// Receive the next message together with the pipe it came from
    pub fn recv_from(&mut self) -> Result<Received> {
        let Received { mut msg, pipe } = self.engine.recv().ok_or(Error::WouldBlock)?;
        if self.socket_type.is_raw() {
            msg.stamp(pipe);
        }
        Ok(Received { msg, pipe })
    }

    fn track_local(&mut self, msg: &Message) -> Result<()> {
        match msg.kind(self.config.topic_framing) {
            FrameKind::Subscribe(topic) => {
                self.local.subscribe(LOCAL, &topic);
                tracing::debug!(topic = ?topic, "Subscription sent upstream");
            }
            FrameKind::Unsubscribe(topic) => {
                if self.local.unsubscribe(LOCAL, &topic) == Unsubscribed::NotFound {
                    return Err(Error::NotSubscribed);
                }
                tracing::debug!(topic = ?topic, "Unsubscription sent upstream");
            }
            _ => {}
        }
        Ok(())
    }

    /// Whether this socket has a live subscription to exactly `topic`
    pub fn is_subscribed(&self, topic: impl AsRef<[u8]>) -> bool {
        self.local.contains(LOCAL, topic.as_ref())
    }

    /// Subscribe to `topic` by sending a subscribe frame to every peer
    pub fn subscribe(&mut self, topic: impl Into<Bytes>) -> Result<Delivery> {
        let topic = topic.into();
        self.send(Message::subscribe(&topic))
    }

    /// Drop one subscription to `topic` by sending an unsubscribe frame
    pub fn unsubscribe(&mut self, topic: impl Into<Bytes>) -> Result<Delivery> {
        let topic = topic.into();
        self.send(Message::unsubscribe(&topic))
    }
}
