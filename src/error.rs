//! Relay error types.
//!
//! [`RelayError`] is the central error type for the relay. Per-message
//! variants ([`RelayError::Decode`], [`RelayError::RecipientNotFound`],
//! [`RelayError::Delivery`]) are contained inside the session that produced
//! them. Only [`RelayError::Transport`] on a session's own connection ends
//! that session.
//!
//! | Variant             | Scope        | Peer-visible                 |
//! |---------------------|--------------|------------------------------|
//! | `Handshake`         | request      | no (logged)                  |
//! | `Decode`            | message      | no (logged, message dropped) |
//! | `RecipientNotFound` | message      | yes, error notification      |
//! | `Delivery`          | message      | no (logged)                  |
//! | `Transport`         | session      | no (session closes)          |
//! | `DuplicateIdentity` | process bug  | no (logged at error level)   |

use crate::domain::ConnectionId;

/// Why a routed message could not be queued for its recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    /// The recipient's outbound queue is at capacity; the message is dropped.
    #[error("outbound queue full")]
    QueueFull,
    /// The recipient's session ended between lookup and send.
    #[error("recipient disconnected")]
    Disconnected,
}

/// Relay error enum.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The WebSocket upgrade failed; no session was created.
    #[error("websocket upgrade failed: {0}")]
    Handshake(#[source] axum::Error),

    /// An inbound payload could not be decoded.
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// No live connection is registered under the addressed identity.
    #[error("recipient not found: {0}")]
    RecipientNotFound(String),

    /// The recipient was resolved but the message could not be queued.
    #[error("delivery to {to} failed: {reason}")]
    Delivery {
        /// Recipient the message was addressed to.
        to: ConnectionId,
        /// Failure cause.
        reason: DeliveryFailure,
    },

    /// Reading from or writing to the session's own connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] axum::Error),

    /// An identity was registered twice. Indicates a broken identity
    /// generator and must never happen.
    #[error("connection {0} is already registered")]
    DuplicateIdentity(ConnectionId),
}

impl RelayError {
    /// Returns `true` for errors that are contained to a single message
    /// and leave the session active.
    #[must_use]
    pub const fn is_per_message(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::RecipientNotFound(_) | Self::Delivery { .. }
        )
    }
}
