//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::IntoResponse;

use super::session::run_session;
use crate::app_state::AppState;
use crate::error::RelayError;

/// `GET /ws` — Upgrade HTTP connection to WebSocket and join the relay.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let relay = Arc::clone(&state.relay);
    let shutdown = state.shutdown.subscribe();

    ws.max_message_size(state.max_message_bytes)
        .on_failed_upgrade(|err| {
            tracing::warn!(error = %RelayError::Handshake(err), "websocket upgrade failed");
        })
        .on_upgrade(move |socket| run_session(socket, relay, shutdown))
}
