//! Outbound side of an accepted connection.
//!
//! The registry never touches sockets. Each connection's writer task owns
//! the socket and drains an unbounded queue of [`Outbound`] actions; the
//! registry only holds the sending half, wrapped in [`ConnectionHandle`].

use tokio::sync::mpsc;

use super::ConnectionId;
use crate::protocol::Envelope;

/// Action for a connection's writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Serialize and send an envelope as a text frame.
    Frame(Envelope),
    /// Send a WebSocket ping.
    Ping,
    /// Send a close frame with the given reason, then stop.
    Close(String),
    /// Drop the socket without a close handshake.
    Terminate,
}

/// Sending half of a connection's outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Creates a handle with a fresh id, returning the queue's receiving half.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: ConnectionId::new(),
                tx,
            },
            rx,
        )
    }

    /// The connection's id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` while the writer task is still draining the queue.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queues an envelope. Returns `false` if the connection is gone.
    pub fn send(&self, envelope: Envelope) -> bool {
        self.tx.send(Outbound::Frame(envelope)).is_ok()
    }

    /// Queues a ping.
    pub fn ping(&self) -> bool {
        self.tx.send(Outbound::Ping).is_ok()
    }

    /// Queues a graceful close.
    pub fn close(&self, reason: impl Into<String>) -> bool {
        self.tx.send(Outbound::Close(reason.into())).is_ok()
    }

    /// Queues an immediate termination.
    pub fn terminate(&self) -> bool {
        self.tx.send(Outbound::Terminate).is_ok()
    }
}
