//! Recording pipe used by unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Pipe, SendOutcome, PRIORITY_DEFAULT};
use crate::message::Message;

#[derive(Debug, Default)]
struct Shared {
    inbound: Mutex<VecDeque<Message>>,
    sent: Mutex<Vec<Message>>,
    attempts: AtomicUsize,
    congested: AtomicBool,
}

/// Test double: scripted inbound queue, recorded outbound copies
#[derive(Debug)]
pub(crate) struct MockPipe {
    priority: u8,
    shared: Arc<Shared>,
}

/// Test-side view of a [`MockPipe`] after it has been attached
#[derive(Debug, Clone)]
pub(crate) struct MockHandle {
    shared: Arc<Shared>,
}

impl MockPipe {
    pub(crate) fn new() -> (Self, MockHandle) {
        Self::with_priority(PRIORITY_DEFAULT)
    }

    pub(crate) fn with_priority(priority: u8) -> (Self, MockHandle) {
        let shared = Arc::new(Shared::default());
        (
            Self {
                priority,
                shared: Arc::clone(&shared),
            },
            MockHandle { shared },
        )
    }
}

impl Pipe for MockPipe {
    fn priority(&self) -> u8 {
        self.priority
    }

    fn send(&mut self, msg: Message) -> SendOutcome {
        self.shared.attempts.fetch_add(1, Ordering::Relaxed);
        if self.shared.congested.load(Ordering::Relaxed) {
            return SendOutcome::Congested;
        }
        self.shared.sent.lock().unwrap().push(msg);
        SendOutcome::Sent
    }

    fn recv(&mut self) -> Option<Message> {
        self.shared.inbound.lock().unwrap().pop_front()
    }
}

impl MockHandle {
    /// Queue a message as if the peer had sent it
    pub(crate) fn push(&self, msg: Message) {
        self.shared.inbound.lock().unwrap().push_back(msg);
    }

    /// Bodies of every message delivered to this pipe
    pub(crate) fn sent_bodies(&self) -> Vec<Vec<u8>> {
        self.shared
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.body().to_vec())
            .collect()
    }

    /// Messages delivered to this pipe
    pub(crate) fn sent(&self) -> Vec<Message> {
        self.shared.sent.lock().unwrap().clone()
    }

    /// Number of times `send` was invoked, congested or not
    pub(crate) fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::Relaxed)
    }

    pub(crate) fn set_congested(&self, congested: bool) {
        self.shared.congested.store(congested, Ordering::Relaxed);
    }
}
