//! # peer-relay
//!
//! Real-time WebSocket relay that routes addressed messages between
//! connected peers.
//!
//! Every connection receives a unique identity on connect
//! (`{"connection_id": "..."}`) and sends `{"to": "<id>", "msg": "..."}`
//! payloads addressed to other identities. The relay stamps the sender,
//! looks the recipient up in the registry, and queues the message on the
//! recipient's connection. Unknown recipients produce
//! `{"error": "receiver client not found"}` for the sender only.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)
//!     │
//!     ├── WS Handler + Session Loop (ws/)
//!     │
//!     ├── RelayService (service/)
//!     │
//!     └── ConnectionRegistry ── PeerHandle ──▶ per-connection outbound queue
//!                (domain/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
