//! Domain layer: identities, payloads, connection handles, and the
//! connection registry.
//!
//! This module contains the relay's core state: the identity type, the
//! JSON payloads exchanged with peers, the per-connection outbound queue
//! handles, the registry of live connections, and the shutdown signal.

pub mod connection_handle;
pub mod connection_id;
pub mod connection_registry;
pub mod message;
pub mod shutdown;

pub use connection_handle::{ConnectionHandle, PeerHandle};
pub use connection_id::ConnectionId;
pub use connection_registry::{ConnectionRegistry, Registration};
pub use message::{InboundMessage, RelayedMessage, ServerMessage};
pub use shutdown::{Shutdown, ShutdownListener};
