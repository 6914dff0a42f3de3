//! Relay service: opens sessions and routes messages between them.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::domain::{
    ConnectionHandle, ConnectionId, ConnectionRegistry, InboundMessage, Registration,
    RelayedMessage, ServerMessage,
};
use crate::error::RelayError;

/// Default bound of each connection's outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Routing layer shared by every session.
///
/// Stateless coordinator over the [`ConnectionRegistry`]. Routing is a
/// pure function of the registry at the moment of lookup: no queuing
/// beyond the recipient's own outbound queue, no retry, no ack.
#[derive(Debug, Clone)]
pub struct RelayService {
    registry: Arc<ConnectionRegistry>,
    outbound_capacity: usize,
}

/// Per-connection state produced by [`RelayService::open_session`].
///
/// Owned exclusively by the session task. Dropping it tears the
/// connection's routing state down: the registry entry goes away and
/// every outstanding [`crate::domain::PeerHandle`] starts failing.
#[derive(Debug)]
pub struct Session {
    /// Registry entry guard; carries the assigned identity.
    pub registration: Registration,
    /// Strong handle keeping the outbound queue open.
    pub handle: ConnectionHandle,
    /// Messages routed to this connection, waiting to be written.
    pub outbound: mpsc::Receiver<ServerMessage>,
}

impl Session {
    /// Identity assigned to this session.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.registration.id()
    }
}

impl RelayService {
    /// Creates a new `RelayService`.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, outbound_capacity: usize) -> Self {
        Self {
            registry,
            outbound_capacity: outbound_capacity.max(1),
        }
    }

    /// Returns a reference to the inner [`ConnectionRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Assigns a fresh identity and registers a new connection.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DuplicateIdentity`] if the generated identity
    /// is already registered.
    pub fn open_session(&self) -> Result<Session, RelayError> {
        let id = ConnectionId::new();
        let (handle, outbound) = ConnectionHandle::channel(self.outbound_capacity);
        let registration = self.registry.register(id, handle.downgrade())?;
        Ok(Session {
            registration,
            handle,
            outbound,
        })
    }

    /// Decodes a raw inbound payload from `from` and routes it.
    ///
    /// Returns the recipient the message was queued for.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Decode`] if the payload is malformed.
    /// - [`RelayError::RecipientNotFound`] if `to` is not registered.
    /// - [`RelayError::Delivery`] if the recipient's queue rejected it.
    ///
    /// All of them are per-message; the sender's session stays active.
    pub fn relay(&self, from: ConnectionId, payload: &[u8]) -> Result<ConnectionId, RelayError> {
        let inbound = InboundMessage::decode(payload).map_err(|err| {
            tracing::warn!(
                connection_id = %from,
                bytes = payload.len(),
                error = %err,
                "discarding malformed payload"
            );
            RelayError::Decode(err)
        })?;
        self.route(inbound.stamp(from))
    }

    /// Routes an already stamped message to its recipient.
    ///
    /// # Errors
    ///
    /// Same per-message errors as [`RelayService::relay`], minus decoding.
    pub fn route(&self, message: RelayedMessage) -> Result<ConnectionId, RelayError> {
        let from = message.from;
        let target = message
            .to
            .parse::<ConnectionId>()
            .ok()
            .and_then(|to| self.registry.lookup(to).map(|peer| (to, peer)));

        let Some((to, peer)) = target else {
            tracing::debug!(connection_id = %from, to = %message.to, "recipient not found");
            return Err(RelayError::RecipientNotFound(message.to));
        };

        match peer.send(ServerMessage::Relay(message)) {
            Ok(()) => {
                tracing::debug!(connection_id = %from, %to, "message relayed");
                Ok(to)
            }
            Err(reason) => {
                tracing::warn!(connection_id = %from, %to, %reason, "message delivery failed");
                Err(RelayError::Delivery { to, reason })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::error::DeliveryFailure;

    fn service(capacity: usize) -> RelayService {
        RelayService::new(Arc::new(ConnectionRegistry::new()), capacity)
    }

    fn open(service: &RelayService) -> Session {
        let Ok(session) = service.open_session() else {
            panic!("session must open");
        };
        session
    }

    fn payload(to: impl std::fmt::Display, msg: &str) -> Vec<u8> {
        serde_json::json!({ "to": to.to_string(), "msg": msg })
            .to_string()
            .into_bytes()
    }

    #[test]
    fn open_session_registers_distinct_identities() {
        let service = service(8);
        let sessions: Vec<_> = (0..16).map(|_| open(&service)).collect();

        assert_eq!(service.registry().len(), 16);
        for session in &sessions {
            assert!(service.registry().contains(session.id()));
        }
        let mut ids: Vec<_> = sessions.iter().map(Session::id).collect();
        ids.sort_by_key(|id| *id.as_uuid());
        ids.dedup();
        assert_eq!(ids.len(), 16);
    }

    #[test]
    fn relays_to_recipient_only() {
        let service = service(8);
        let mut a = open(&service);
        let mut b = open(&service);

        let delivered = service.relay(a.id(), &payload(b.id(), "hi"));
        assert!(matches!(delivered, Ok(to) if to == b.id()));

        let Ok(received) = b.outbound.try_recv() else {
            panic!("recipient must have a queued message");
        };
        assert_eq!(
            received,
            ServerMessage::Relay(RelayedMessage {
                from: a.id(),
                to: b.id().to_string(),
                msg: "hi".to_string(),
            })
        );
        assert!(b.outbound.try_recv().is_err());
        assert!(a.outbound.try_recv().is_err());
    }

    #[test]
    fn client_supplied_from_is_overwritten() {
        let service = service(8);
        let a = open(&service);
        let mut b = open(&service);
        let spoofed = ConnectionId::new();
        let raw = serde_json::json!({
            "from": spoofed.to_string(),
            "to": b.id().to_string(),
            "body": "hello",
        })
        .to_string();

        tokio_test::assert_ok!(service.relay(a.id(), raw.as_bytes()));
        let Ok(ServerMessage::Relay(relayed)) = b.outbound.try_recv() else {
            panic!("expected relayed message");
        };
        assert_eq!(relayed.from, a.id());
        assert_eq!(relayed.msg, "hello");
    }

    #[test]
    fn unknown_recipient_is_a_miss() {
        let service = service(8);
        let a = open(&service);

        let ghost = service.relay(a.id(), &payload("ghost", "x"));
        assert!(matches!(ghost, Err(RelayError::RecipientNotFound(to)) if to == "ghost"));

        let absent = service.relay(a.id(), &payload(ConnectionId::new(), "x"));
        assert!(matches!(absent, Err(RelayError::RecipientNotFound(_))));
    }

    #[test]
    fn malformed_payload_leaves_others_untouched() {
        let service = service(8);
        let a = open(&service);
        let mut b = open(&service);

        let bad = service.relay(a.id(), b"{ not json");
        assert!(matches!(bad, Err(RelayError::Decode(_))));

        assert!(service.registry().contains(a.id()));
        assert!(service.registry().contains(b.id()));
        assert!(b.outbound.try_recv().is_err());

        tokio_test::assert_ok!(service.relay(a.id(), &payload(b.id(), "still here")));
        assert!(b.outbound.try_recv().is_ok());
    }

    #[test]
    fn closed_session_becomes_a_miss() {
        let service = service(8);
        let a = open(&service);
        let b = open(&service);
        let b_id = b.id();

        drop(b);

        assert!(service.registry().lookup(b_id).is_none());
        let after = service.relay(a.id(), &payload(b_id, "late"));
        assert!(matches!(after, Err(RelayError::RecipientNotFound(_))));
    }

    #[test]
    fn released_handle_is_a_delivery_failure() {
        let service = service(8);
        let a = open(&service);
        let Session {
            registration,
            handle,
            outbound: _outbound,
        } = open(&service);
        let b_id = registration.id();

        // Session mid-teardown: queue released, entry not yet removed.
        drop(handle);

        let result = service.relay(a.id(), &payload(b_id, "racing"));
        assert!(matches!(
            result,
            Err(RelayError::Delivery { to, reason: DeliveryFailure::Disconnected }) if to == b_id
        ));
        drop(registration);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let service = service(2);
        let a = open(&service);
        let mut b = open(&service);

        tokio_test::assert_ok!(service.relay(a.id(), &payload(b.id(), "1")));
        tokio_test::assert_ok!(service.relay(a.id(), &payload(b.id(), "2")));
        let overflow = service.relay(a.id(), &payload(b.id(), "3"));
        assert!(matches!(
            overflow,
            Err(RelayError::Delivery { reason: DeliveryFailure::QueueFull, .. })
        ));

        let mut order = Vec::new();
        while let Ok(ServerMessage::Relay(m)) = b.outbound.try_recv() {
            order.push(m.msg);
        }
        assert_eq!(order, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn self_addressed_message_is_queued_for_sender() {
        let service = service(8);
        let mut a = open(&service);

        tokio_test::assert_ok!(service.relay(a.id(), &payload(a.id(), "echo")));
        assert!(matches!(a.outbound.try_recv(), Ok(ServerMessage::Relay(m)) if m.msg == "echo"));
    }
}
