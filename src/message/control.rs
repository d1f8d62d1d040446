//! Control frame decoding
//!
//! Subscriptions travel in-band with data. The leading byte of a body is the
//! discriminator; the remainder is the topic (for control frames) or the
//! matchable topic-prefixed payload (for data).

use bytes::Bytes;

/// Discriminator for data frames
pub const DATA: u8 = b'M';
/// Discriminator for subscribe frames
pub const SUBSCRIBE: u8 = b'S';
/// Discriminator for unsubscribe frames
pub const UNSUBSCRIBE: u8 = b'U';

/// How the topic of a subscribe/unsubscribe frame is delimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicFraming {
    /// Topic ends at the first NUL byte, or at the end of the body
    #[default]
    NulTerminated,
    /// Topic is every byte after the discriminator
    LengthDelimited,
}

impl TopicFraming {
    fn topic(self, rest: &Bytes) -> Bytes {
        match self {
            TopicFraming::NulTerminated => match rest.iter().position(|&b| b == 0) {
                Some(end) => rest.slice(..end),
                None => rest.clone(),
            },
            TopicFraming::LengthDelimited => rest.clone(),
        }
    }
}

/// Decoded meaning of a message body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// Data frame; the bytes after `'M'` are matched against subscriptions
    Data(Bytes),
    /// Subscribe the delivering pipe to a topic
    Subscribe(Bytes),
    /// Unsubscribe the delivering pipe from a topic
    Unsubscribe(Bytes),
    /// Unknown discriminator
    Unknown(u8),
    /// Body has no discriminator at all
    Empty,
}

impl FrameKind {
    /// Classify a body. Topic slices share the body's allocation.
    pub fn decode(body: &Bytes, framing: TopicFraming) -> Self {
        let Some(&op) = body.first() else {
            return FrameKind::Empty;
        };
        let rest = body.slice(1..);

        match op {
            DATA => FrameKind::Data(rest),
            SUBSCRIBE => FrameKind::Subscribe(framing.topic(&rest)),
            UNSUBSCRIBE => FrameKind::Unsubscribe(framing.topic(&rest)),
            other => FrameKind::Unknown(other),
        }
    }

    /// Whether this is a data frame
    pub fn is_data(&self) -> bool {
        matches!(self, FrameKind::Data(_))
    }
}
