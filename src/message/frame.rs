//! Message type shared by every pipe
//!
//! Cloning a [`Message`] is the bulk copy used during fan-out: the body and
//! header are reference counted, never duplicated.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::control::{FrameKind, TopicFraming, DATA, SUBSCRIBE, UNSUBSCRIBE};
use crate::error::{Error, Result};
use crate::pipe::PipeId;

/// Length of a routing header carrying a pipe id
pub const ROUTING_HEADER_LEN: usize = 8;

/// A message travelling through the socket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Routing header (empty, or a pipe id stamped by a raw socket)
    header: Bytes,
    /// Message body (zero-copy via reference counting)
    body: Bytes,
}

impl Message {
    /// Create a message with no routing header
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            header: Bytes::new(),
            body: body.into(),
        }
    }

    /// Create a message with an explicit routing header
    pub fn with_header(header: impl Into<Bytes>, body: impl Into<Bytes>) -> Self {
        Self {
            header: header.into(),
            body: body.into(),
        }
    }

    /// Create a data frame: `'M'` followed by the topic-prefixed payload
    pub fn data(payload: &[u8]) -> Self {
        Self::new(Self::control_body(DATA, payload))
    }

    /// Create a subscribe frame for `topic`
    pub fn subscribe(topic: &[u8]) -> Self {
        Self::new(Self::control_body(SUBSCRIBE, topic))
    }

    /// Create an unsubscribe frame for `topic`
    pub fn unsubscribe(topic: &[u8]) -> Self {
        Self::new(Self::control_body(UNSUBSCRIBE, topic))
    }

    fn control_body(op: u8, rest: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + rest.len());
        buf.put_u8(op);
        buf.put_slice(rest);
        buf.freeze()
    }

    /// Message body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Routing header (may be empty)
    pub fn header(&self) -> &Bytes {
        &self.header
    }

    /// Whether a routing header is present
    pub fn has_header(&self) -> bool {
        !self.header.is_empty()
    }

    /// Body length in bytes
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the body is empty
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Decode the routing header into a pipe id
    ///
    /// An empty header yields `None`; anything other than 0 or 8 bytes is
    /// rejected.
    pub fn routing_id(&self) -> Result<Option<PipeId>> {
        match self.header.len() {
            0 => Ok(None),
            ROUTING_HEADER_LEN => {
                let mut hdr = &self.header[..];
                Ok(Some(PipeId::from_raw(hdr.get_u64())))
            }
            len => Err(Error::InvalidHeader(len)),
        }
    }

    /// Stamp the routing header with the id of the pipe the message came from
    pub fn stamp(&mut self, id: PipeId) {
        let mut hdr = BytesMut::with_capacity(ROUTING_HEADER_LEN);
        hdr.put_u64(id.as_u64());
        self.header = hdr.freeze();
    }

    /// Remove and return the routing header
    pub fn take_header(&mut self) -> Bytes {
        std::mem::take(&mut self.header)
    }

    /// Classify the body according to the control protocol
    pub fn kind(&self, framing: TopicFraming) -> FrameKind {
        FrameKind::decode(&self.body, framing)
    }

    /// Consume the message, returning its body
    pub fn into_body(self) -> Bytes {
        self.body
    }
}
