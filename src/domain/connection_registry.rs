//! Concurrent directory of live connections.
//!
//! [`ConnectionRegistry`] maps every connected [`ConnectionId`] to a
//! [`PeerHandle`]. The map sits behind a single [`RwLock`] that is held
//! only for the map operation itself, never across I/O or an `.await`, so
//! a slow peer can never stall routing for everybody else.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{ConnectionId, PeerHandle};
use crate::error::RelayError;

/// Central store for all live connections.
///
/// # Concurrency
///
/// - Lookups run concurrently with each other.
/// - Register and deregister take the write lock for a single insert or
///   remove.
/// - A poisoned lock is recovered: every critical section is a single
///   `HashMap` call, so the map is never left half-updated.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, PeerHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the guard that owns the entry.
    ///
    /// The entry is visible to every subsequent [`lookup`](Self::lookup)
    /// and is removed when the returned [`Registration`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::DuplicateIdentity`] if `id` is already present.
    /// The existing entry is left untouched. With UUID v4 identities this
    /// can only happen if identity generation is broken.
    ///
    /// # Panics
    ///
    /// In debug builds a duplicate identity trips a `debug_assert!`.
    pub fn register(
        self: &Arc<Self>,
        id: ConnectionId,
        handle: PeerHandle,
    ) -> Result<Registration, RelayError> {
        {
            let mut map = self
                .connections
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            debug_assert!(!map.contains_key(&id), "identity {id} registered twice");
            if map.contains_key(&id) {
                drop(map);
                tracing::error!(connection_id = %id, "identity collision in connection registry");
                return Err(RelayError::DuplicateIdentity(id));
            }
            map.insert(id, handle);
        }
        tracing::debug!(connection_id = %id, "connection registered");
        Ok(Registration {
            id,
            registry: Arc::clone(self),
        })
    }

    /// Removes a connection. Returns `true` if an entry was removed.
    ///
    /// Idempotent: removing an absent identity is a no-op.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        let removed = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            tracing::debug!(connection_id = %id, "connection deregistered");
        }
        removed
    }

    /// Returns the handle registered under `id` at the instant of the call.
    ///
    /// The connection may close right after this returns; callers handle
    /// that through the send result.
    #[must_use]
    pub fn lookup(&self, id: ConnectionId) -> Option<PeerHandle> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Returns `true` if `id` is currently registered.
    #[must_use]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Returns the identities of all registered connections.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }

    /// Returns the number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Ownership of a registry entry.
///
/// Held by the session for its whole lifetime. Dropping it deregisters the
/// connection, so the entry goes away on every exit path, including task
/// cancellation.
#[derive(Debug)]
pub struct Registration {
    id: ConnectionId,
    registry: Arc<ConnectionRegistry>,
}

impl Registration {
    /// Identity this registration owns.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.deregister(self.id);
    }
}
