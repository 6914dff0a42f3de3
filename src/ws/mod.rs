//! WebSocket layer: upgrade handling and the per-connection session loop.
//!
//! The WebSocket endpoint at `/ws` is the relay's only data path. Every
//! accepted connection runs [`session::run_session`] on its own task.

pub mod handler;
pub mod session;
