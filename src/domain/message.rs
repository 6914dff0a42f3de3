//! Relay payloads: what peers send in and what the relay sends out.
//!
//! All payloads are JSON objects carried in WebSocket frames.

use serde::{Deserialize, Serialize};

use super::ConnectionId;

/// Fixed text of the notification sent when a recipient is not connected.
pub const RECIPIENT_NOT_FOUND: &str = "receiver client not found";

/// Message as submitted by a peer.
///
/// A client-supplied `from` field (and any other unknown field) is ignored;
/// the relay always stamps the sender itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    /// Identity of the intended recipient, exactly as the client sent it.
    pub to: String,
    /// Message content. Accepted under either `msg` or `body`.
    #[serde(alias = "body")]
    pub msg: String,
}

impl InboundMessage {
    /// Decodes an inbound payload from raw frame bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the payload is not a JSON object
    /// with string `to` and `msg` (or `body`) fields.
    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Stamps the message with its sender, producing the relayed form.
    #[must_use]
    pub fn stamp(self, from: ConnectionId) -> RelayedMessage {
        RelayedMessage {
            from,
            to: self.to,
            msg: self.msg,
        }
    }
}

/// Message as delivered to its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayedMessage {
    /// Identity of the sending connection, set by the relay.
    pub from: ConnectionId,
    /// Recipient identity, copied through from the inbound message.
    pub to: String,
    /// Content, copied through unchanged.
    pub msg: String,
}

/// Every payload the relay writes to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Connection acknowledgment carrying the assigned identity.
    Welcome {
        /// The identity assigned to this connection.
        connection_id: ConnectionId,
    },
    /// A message routed from another peer.
    Relay(RelayedMessage),
    /// Error notification for the sender.
    Error {
        /// Human-readable error message.
        error: String,
    },
}

impl ServerMessage {
    /// Builds the acknowledgment for a freshly registered connection.
    #[must_use]
    pub const fn welcome(connection_id: ConnectionId) -> Self {
        Self::Welcome { connection_id }
    }

    /// Builds the recipient-not-found notification.
    #[must_use]
    pub fn recipient_not_found() -> Self {
        Self::Error {
            error: RECIPIENT_NOT_FOUND.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_ignores_client_from() {
        let Ok(msg) = InboundMessage::decode(br#"{"from":"spoofed","to":"b1","msg":"hi"}"#) else {
            panic!("valid payload");
        };
        assert_eq!(msg.to, "b1");
        assert_eq!(msg.msg, "hi");
    }

    #[test]
    fn decode_accepts_body_alias() {
        let Ok(msg) = InboundMessage::decode(br#"{"to":"b1","body":"hello"}"#) else {
            panic!("valid payload");
        };
        assert_eq!(msg.msg, "hello");
    }

    #[test]
    fn decode_rejects_missing_fields() {
        assert!(InboundMessage::decode(br#"{"msg":"no target"}"#).is_err());
        assert!(InboundMessage::decode(br#"{"to":"b1"}"#).is_err());
        assert!(InboundMessage::decode(b"not json").is_err());
        assert!(InboundMessage::decode(br#"["to","b1"]"#).is_err());
    }

    #[test]
    fn stamp_overwrites_sender_and_keeps_content() {
        let from = ConnectionId::new();
        let inbound = InboundMessage {
            to: "b1".to_string(),
            msg: "  raw \u{1F600} ".to_string(),
        };
        let relayed = inbound.stamp(from);
        assert_eq!(relayed.from, from);
        assert_eq!(relayed.to, "b1");
        assert_eq!(relayed.msg, "  raw \u{1F600} ");
    }

    #[test]
    fn wire_shapes() {
        let id = ConnectionId::new();
        let welcome = serde_json::to_value(ServerMessage::welcome(id)).ok();
        assert_eq!(welcome, Some(json!({ "connection_id": id.to_string() })));

        let error = serde_json::to_value(ServerMessage::recipient_not_found()).ok();
        assert_eq!(error, Some(json!({ "error": "receiver client not found" })));

        let relay = ServerMessage::Relay(RelayedMessage {
            from: id,
            to: "b1".to_string(),
            msg: "hi".to_string(),
        });
        let relay = serde_json::to_value(relay).ok();
        assert_eq!(
            relay,
            Some(json!({ "from": id.to_string(), "to": "b1", "msg": "hi" }))
        );
    }
}
