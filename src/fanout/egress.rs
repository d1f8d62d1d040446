//! Outbound distributor
//!
//! Tracks which pipes can currently take messages. A pipe that reports
//! congestion is released from the writable set and only comes back when the
//! transport signals it writable again; its subscriptions are untouched.

use crate::message::Message;
use crate::pipe::{PipeId, SendOutcome};
use crate::trie::{Delivery, SubscriberSet};

/// Writable-pipe set with fan-out helpers
#[derive(Debug, Default)]
pub struct Distributor {
    writable: SubscriberSet,
}

impl Distributor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pipe to the writable set; no-op if it is already there
    pub fn mark_writable(&mut self, pipe: PipeId) -> bool {
        if self.writable.contains(pipe) {
            return false;
        }
        self.writable.add(pipe)
    }

    /// Drop a pipe from the writable set
    pub fn release(&mut self, pipe: PipeId) -> bool {
        self.writable.evict(pipe)
    }

    pub fn is_writable(&self, pipe: PipeId) -> bool {
        self.writable.contains(pipe)
    }

    /// Whether at least one pipe can take a message
    pub fn can_send(&self) -> bool {
        !self.writable.is_empty()
    }

    /// Writable pipes in the order they became writable
    pub fn writable(&self) -> impl Iterator<Item = PipeId> + '_ {
        self.writable.iter()
    }

    /// Send to every writable pipe except `exclude`
    pub fn broadcast<F>(&mut self, msg: Message, exclude: Option<PipeId>, mut send: F) -> Delivery
    where
        F: FnMut(PipeId, Message) -> SendOutcome,
    {
        self.writable.distribute(msg, exclude, |pipe, copy| {
            let outcome = send(pipe, copy);
            if outcome == SendOutcome::Congested {
                tracing::debug!(pipe = %pipe, "Pipe congested, released from fan-out");
            }
            outcome
        })
    }

    /// Send to each of `targets` that is writable and not `exclude`
    pub fn send_to<I, F>(
        &mut self,
        targets: I,
        msg: Message,
        exclude: Option<PipeId>,
        mut send: F,
    ) -> Delivery
    where
        I: IntoIterator<Item = PipeId>,
        F: FnMut(PipeId, Message) -> SendOutcome,
    {
        let mut delivery = Delivery::default();

        for pipe in targets {
            if Some(pipe) == exclude || !self.writable.contains(pipe) {
                continue;
            }
            match send(pipe, msg.clone()) {
                SendOutcome::Sent => delivery.recipients += 1,
                SendOutcome::Congested => {
                    tracing::debug!(pipe = %pipe, "Pipe congested, released from fan-out");
                    self.writable.evict(pipe);
                    delivery.released += 1;
                }
            }
        }

        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipe(n: u64) -> PipeId {
        PipeId::from_raw(n)
    }

    fn distributor(ids: &[u64]) -> Distributor {
        let mut out = Distributor::new();
        for &n in ids {
            out.mark_writable(pipe(n));
        }
        out
    }

    #[test]
    fn test_mark_writable_is_idempotent() {
        let mut out = distributor(&[1]);
        assert!(!out.mark_writable(pipe(1)));
        assert_eq!(out.writable().count(), 1);

        assert!(out.release(pipe(1)));
        assert!(!out.can_send());
        assert!(out.mark_writable(pipe(1)));
    }

    #[test]
    fn test_broadcast_releases_congested() {
        let mut out = distributor(&[1, 2, 3]);
        let delivery = out.broadcast(Message::data(b"x"), None, |p, _| {
            if p == pipe(2) {
                SendOutcome::Congested
            } else {
                SendOutcome::Sent
            }
        });

        assert_eq!(delivery, Delivery { recipients: 2, released: 1 });
        assert!(!out.is_writable(pipe(2)));
        assert!(out.is_writable(pipe(3)));
    }

    #[test]
    fn test_send_to_skips_unwritable_and_excluded() {
        let mut out = distributor(&[1, 2, 3]);
        out.release(pipe(3));

        let mut seen = Vec::new();
        let delivery = out.send_to(
            [pipe(1), pipe(2), pipe(3), pipe(4)],
            Message::data(b"x"),
            Some(pipe(1)),
            |p, _| {
                seen.push(p);
                SendOutcome::Sent
            },
        );

        assert_eq!(seen, vec![pipe(2)]);
        assert_eq!(delivery.recipients, 1);
    }

    #[test]
    fn test_send_to_releases_congested() {
        let mut out = distributor(&[1, 2]);
        let delivery = out.send_to([pipe(1), pipe(2)], Message::data(b"x"), None, |p, _| {
            if p == pipe(1) {
                SendOutcome::Congested
            } else {
                SendOutcome::Sent
            }
        });

        assert_eq!(delivery, Delivery { recipients: 1, released: 1 });
        assert_eq!(out.writable().collect::<Vec<_>>(), vec![pipe(2)]);
    }
}
