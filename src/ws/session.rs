//! WebSocket session state machine.
//!
//! Drives one connection from registration to teardown:
//!
//! ```text
//! Connecting ─▶ Assigning ─▶ Active ─▶ Closing
//!                   │                     ▲
//!                   └── ack send fails ───┘
//! ```
//!
//! Closing is the single exit path. It deregisters the identity, releases
//! the outbound queue and closes the socket, whatever ended the session.
//! Every write on the session's socket races the shutdown signal, and the
//! final close is bounded, so a peer that never reads cannot hold a session
//! open past shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::domain::{ConnectionId, ServerMessage, ShutdownListener};
use crate::error::RelayError;
use crate::service::{RelayService, Session};

/// Upper bound on the closing handshake with a peer that stopped reading.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Why an active session ended without a transport fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// The peer sent a close frame or the stream ended.
    PeerClosed,
    /// The process is shutting down.
    Shutdown,
    /// The outbound queue was closed underneath the session.
    QueueClosed,
}

impl CloseReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::PeerClosed => "peer closed",
            Self::Shutdown => "shutdown",
            Self::QueueClosed => "outbound queue closed",
        }
    }
}

/// Runs the full lifecycle of a single WebSocket connection.
///
/// - Registers the connection and acknowledges its identity.
/// - Routes every inbound message through the [`RelayService`].
/// - Writes messages routed to this connection back to the peer.
/// - Deregisters on close, transport error, or shutdown.
pub async fn run_session(
    socket: WebSocket,
    relay: Arc<RelayService>,
    shutdown: ShutdownListener,
) {
    let session = match relay.open_session() {
        Ok(session) => session,
        Err(err) => {
            tracing::error!(error = %err, "rejecting connection");
            return;
        }
    };

    let span = tracing::info_span!("session", connection_id = %session.id());
    drive(socket, session, &relay, shutdown).instrument(span).await;
}

async fn drive(
    socket: WebSocket,
    session: Session,
    relay: &RelayService,
    mut shutdown: ShutdownListener,
) {
    let Session {
        registration,
        handle,
        mut outbound,
    } = session;
    let id = registration.id();
    let (mut ws_tx, mut ws_rx) = socket.split();
    tracing::info!("client connected");

    let welcome = ServerMessage::welcome(id);
    let end = match send_or_shutdown(&mut ws_tx, &welcome, &mut shutdown).await {
        Ok(None) => {
            run_active(
                id,
                relay,
                &mut ws_tx,
                &mut ws_rx,
                &mut outbound,
                &mut shutdown,
            )
            .await
        }
        Ok(Some(reason)) => Ok(reason),
        Err(err) => {
            tracing::warn!(error = %err, "failed to send connection acknowledgment");
            Err(err)
        }
    };

    // Closing
    drop(registration);
    drop(handle);
    drop(outbound);
    match tokio::time::timeout(CLOSE_TIMEOUT, ws_tx.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::debug!(error = %err, "websocket close failed"),
        Err(_) => tracing::debug!("websocket close timed out"),
    }

    match end {
        Ok(reason) => tracing::info!(reason = reason.as_str(), "client disconnected"),
        Err(err) => tracing::warn!(error = %err, "client disconnected"),
    }
}

async fn run_active(
    id: ConnectionId,
    relay: &RelayService,
    ws_tx: &mut SplitSink<WebSocket, Message>,
    ws_rx: &mut SplitStream<WebSocket>,
    outbound: &mut mpsc::Receiver<ServerMessage>,
    shutdown: &mut ShutdownListener,
) -> Result<CloseReason, RelayError> {
    loop {
        let interrupted = tokio::select! {
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    handle_payload(id, relay, ws_tx, shutdown, text.as_str().as_bytes()).await?
                }
                Some(Ok(Message::Binary(bytes))) => {
                    handle_payload(id, relay, ws_tx, shutdown, &bytes).await?
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => None,
                Some(Ok(Message::Close(_))) | None => return Ok(CloseReason::PeerClosed),
                Some(Err(err)) => return Err(RelayError::Transport(err)),
            },
            queued = outbound.recv() => {
                let Some(message) = queued else {
                    return Ok(CloseReason::QueueClosed);
                };
                send_or_shutdown(ws_tx, &message, shutdown).await?
            }
            () = shutdown.wait() => Some(CloseReason::Shutdown),
        };
        if let Some(reason) = interrupted {
            return Ok(reason);
        }
    }
}

/// Routes one inbound payload. Only a failure to write the miss
/// notification on the sender's own socket escapes as an error.
async fn handle_payload(
    id: ConnectionId,
    relay: &RelayService,
    ws_tx: &mut SplitSink<WebSocket, Message>,
    shutdown: &mut ShutdownListener,
    payload: &[u8],
) -> Result<Option<CloseReason>, RelayError> {
    match relay.relay(id, payload) {
        Ok(_) => Ok(None),
        Err(RelayError::RecipientNotFound(_)) => {
            send_or_shutdown(ws_tx, &ServerMessage::recipient_not_found(), shutdown).await
        }
        Err(err) if err.is_per_message() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Writes one frame to the peer unless shutdown fires first.
///
/// A peer that stops reading blocks the write once the TCP window is full,
/// so every write on the session's own socket goes through here. Returns
/// `Some(CloseReason::Shutdown)` when the write was abandoned.
async fn send_or_shutdown(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
    shutdown: &mut ShutdownListener,
) -> Result<Option<CloseReason>, RelayError> {
    tokio::select! {
        sent = send_frame(ws_tx, message) => sent.map(|()| None),
        () = shutdown.wait() => Ok(Some(CloseReason::Shutdown)),
    }
}

async fn send_frame(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), RelayError> {
    match serde_json::to_string(message) {
        Ok(json) => ws_tx.send(Message::text(json)).await.map_err(RelayError::Transport),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode outbound payload");
            Ok(())
        }
    }
}
