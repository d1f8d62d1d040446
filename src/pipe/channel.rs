//! In-process pipes over bounded tokio channels
//!
//! [`channel_pipe`] returns the socket side ([`ChannelPipe`], attached to a
//! socket) and the peer side ([`PeerEndpoint`], held by whoever plays the
//! remote peer). A full or closed outbound queue reports
//! [`SendOutcome::Congested`].

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{Pipe, SendOutcome};
use crate::message::Message;

/// Socket side of an in-process pipe
#[derive(Debug)]
pub struct ChannelPipe {
    priority: u8,
    /// Socket -> peer
    tx: mpsc::Sender<Message>,
    /// Peer -> socket
    rx: mpsc::Receiver<Message>,
}

/// Peer side of an in-process pipe
#[derive(Debug)]
pub struct PeerEndpoint {
    /// Peer -> socket
    tx: mpsc::Sender<Message>,
    /// Socket -> peer
    rx: mpsc::Receiver<Message>,
}

/// Create a connected pipe pair with `capacity` slots in each direction
pub fn channel_pipe(capacity: usize, priority: u8) -> (ChannelPipe, PeerEndpoint) {
    let (to_peer_tx, to_peer_rx) = mpsc::channel(capacity);
    let (to_socket_tx, to_socket_rx) = mpsc::channel(capacity);

    let pipe = ChannelPipe {
        priority,
        tx: to_peer_tx,
        rx: to_socket_rx,
    };
    let peer = PeerEndpoint {
        tx: to_socket_tx,
        rx: to_peer_rx,
    };

    (pipe, peer)
}

impl Pipe for ChannelPipe {
    fn priority(&self) -> u8 {
        self.priority
    }

    fn send(&mut self, msg: Message) -> SendOutcome {
        match self.tx.try_send(msg) {
            Ok(()) => SendOutcome::Sent,
            Err(TrySendError::Full(_)) => SendOutcome::Congested,
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Peer endpoint closed, dropping message");
                SendOutcome::Congested
            }
        }
    }

    fn recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }
}

impl PeerEndpoint {
    /// Queue a message towards the socket without waiting
    ///
    /// Returns the message back if the queue is full or the socket side is gone.
    pub fn try_send(&self, msg: Message) -> Result<(), Message> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(m) | TrySendError::Closed(m) => m,
        })
    }

    /// Queue a message towards the socket, waiting for capacity
    pub async fn send(&self, msg: Message) -> Result<(), Message> {
        self.tx.send(msg).await.map_err(|e| e.0)
    }

    /// Take the next message delivered by the socket, if any
    pub fn try_recv(&mut self) -> Option<Message> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next message delivered by the socket
    ///
    /// Returns `None` once the socket side has been dropped.
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}
