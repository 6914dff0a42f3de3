//! Outbound queue handles for a connection.
//!
//! Each session owns a bounded [`mpsc`] queue feeding its socket writer.
//! The session keeps the only strong [`ConnectionHandle`]; everybody else
//! (the registry, and routers holding a lookup result) gets a
//! [`PeerHandle`], which wraps a [`mpsc::WeakSender`]. Once the session
//! drops its handle, every `PeerHandle` to it fails with
//! [`DeliveryFailure::Disconnected`].

use tokio::sync::mpsc;

use super::message::ServerMessage;
use crate::error::DeliveryFailure;

/// Strong, session-owned sending half of a connection's outbound queue.
#[derive(Debug)]
pub struct ConnectionHandle {
    sender: mpsc::Sender<ServerMessage>,
}

impl ConnectionHandle {
    /// Creates a handle together with the receiving half of its queue.
    ///
    /// `capacity` is clamped to at least 1.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ServerMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Returns a non-owning handle suitable for the registry.
    #[must_use]
    pub fn downgrade(&self) -> PeerHandle {
        PeerHandle {
            sender: self.sender.downgrade(),
        }
    }
}

/// Non-owning reference to a connection's outbound queue.
///
/// Cannot keep the connection alive and cannot close it.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    sender: mpsc::WeakSender<ServerMessage>,
}

impl PeerHandle {
    /// Queues a message for the connection without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryFailure::QueueFull`] when the queue is at capacity
    /// and [`DeliveryFailure::Disconnected`] when the owning session has
    /// already released its handle.
    pub fn send(&self, message: ServerMessage) -> Result<(), DeliveryFailure> {
        let Some(sender) = self.sender.upgrade() else {
            return Err(DeliveryFailure::Disconnected);
        };
        sender.try_send(message).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryFailure::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryFailure::Disconnected,
        })
    }

    /// Returns `true` while the owning session still holds its handle.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.sender
            .upgrade()
            .is_some_and(|sender| !sender.is_closed())
    }
}
