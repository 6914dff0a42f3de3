//! peer-relay server entry point.
//!
//! Starts the Axum HTTP server with the WebSocket relay endpoint.

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use peer_relay::api;
use peer_relay::app_state::AppState;
use peer_relay::config::{LogFormat, RelayConfig};
use peer_relay::domain::Shutdown;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config first so a `.env` file can also set RUST_LOG.
    let config = RelayConfig::from_env().context("failed to load configuration")?;
    init_tracing(config.log_format);
    tracing::info!(
        addr = %config.listen_addr,
        outbound_queue_capacity = config.outbound_queue_capacity,
        "starting peer-relay"
    );

    let app_state = AppState::new(&config);
    let shutdown = app_state.shutdown.clone();

    let app = api::build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, path = api::WS_PATH, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Resolves on Ctrl-C and tells every open session to close.
async fn shutdown_signal(shutdown: Shutdown) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested, closing sessions");
    shutdown.trigger();
}
