//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::domain::{ConnectionRegistry, Shutdown};
use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Relay service owning the connection registry.
    pub relay: Arc<RelayService>,
    /// Process-wide shutdown signal observed by every session.
    pub shutdown: Shutdown,
    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_bytes: usize,
}

impl AppState {
    /// Builds the state for a fresh process: an empty registry and an
    /// untriggered shutdown signal.
    #[must_use]
    pub fn new(config: &RelayConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            relay: Arc::new(RelayService::new(registry, config.outbound_queue_capacity)),
            shutdown: Shutdown::new(),
            max_message_bytes: config.max_message_bytes,
        }
    }

    /// Returns the connection registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.relay.registry()
    }
}
