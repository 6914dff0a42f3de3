//! Process-wide shutdown signal.
//!
//! [`Shutdown`] wraps a [`tokio::sync::watch`] channel. `main` triggers it
//! on Ctrl-C and every session loop waits on a [`ShutdownListener`], so no
//! session is left blocked on a socket once the process is stopping.

use std::sync::Arc;

use tokio::sync::watch;

/// Trigger side of the shutdown signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    sender: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Creates a signal that has not fired yet.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Fires the signal. Subsequent calls are no-ops.
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Returns `true` once the signal has fired.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }

    /// Creates a listener. Listeners created after the signal fired
    /// resolve immediately.
    #[must_use]
    pub fn subscribe(&self) -> ShutdownListener {
        ShutdownListener {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Waiting side of the shutdown signal, one per session.
#[derive(Debug, Clone)]
pub struct ShutdownListener {
    receiver: watch::Receiver<bool>,
}

impl ShutdownListener {
    /// Resolves once shutdown has been triggered, or once every
    /// [`Shutdown`] handle has been dropped.
    ///
    /// Cancel-safe: usable as a `tokio::select!` branch inside a loop.
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow_and_update() {
            if self.receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn listener_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();

        let waiter = tokio::spawn(async move { listener.wait().await });
        assert!(!shutdown.is_triggered());
        shutdown.trigger();

        let joined = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(matches!(joined, Ok(Ok(()))));
        assert!(shutdown.is_triggered());
    }

    #[tokio::test]
    async fn late_listener_resolves_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();

        let mut listener = shutdown.subscribe();
        let waited = tokio::time::timeout(Duration::from_millis(100), listener.wait()).await;
        assert!(waited.is_ok());
    }

    #[tokio::test]
    async fn pending_until_triggered() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();
        let waited = tokio::time::timeout(Duration::from_millis(50), listener.wait()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn dropped_signal_releases_listeners() {
        let shutdown = Shutdown::new();
        let mut listener = shutdown.subscribe();
        drop(shutdown);

        let waited = tokio::time::timeout(Duration::from_millis(100), listener.wait()).await;
        assert!(waited.is_ok());
    }
}
