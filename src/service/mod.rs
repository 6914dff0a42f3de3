//! Service layer: session setup and message routing.
//!
//! [`RelayService`] assigns identities, registers connections in the
//! [`super::domain::ConnectionRegistry`], and routes stamped messages to
//! their recipients.

pub mod relay_service;

pub use relay_service::{RelayService, Session};
