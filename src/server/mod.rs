//! HTTP server for plugin web assets.
//!
//! Clients receive asset URLs in `webResources` events and load them from
//! this server:
//!
//! ```text
//! +---------------------------------------------------------------+
//! |  Axum HTTP Server                                             |
//! |  /health (GET)                               -> health check  |
//! |  /api/assets/plugin/{plugin}/path/{*path}    -> asset bytes   |
//! +---------------------------------------------------------------+
//!          |
//!          v
//! +---------------------------------------------------------------+
//! |  PluginRegistry::web_resource(plugin, path)                   |
//! +---------------------------------------------------------------+
//! ```
//!
//! # Feature Flag
//!
//! This module is only available when the `server` feature is enabled.

mod handlers;

pub use handlers::{AppState, ErrorResponse, HealthResponse};

use anyhow::Context;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::resources::PluginRegistry;
use crate::settings::ServerSettings;

/// Start the HTTP server.
///
/// Use port 0 for a random available port. Returns the bound address and a
/// cancellation token that shuts the server down gracefully.
pub async fn start_server(
    settings: &ServerSettings,
    registry: Arc<dyn PluginRegistry>,
) -> anyhow::Result<(SocketAddr, CancellationToken)> {
    let addr: SocketAddr = format!("{}:{}", settings.bind, settings.port)
        .parse()
        .with_context(|| format!("Invalid bind address {:?}", settings.bind))?;

    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;
    tracing::info!("HTTP server listening on {}", actual_addr);

    let app = create_router(registry);
    let shutdown_token = CancellationToken::new();
    let server_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_token))
}

/// Create the router with all routes configured.
pub fn create_router(registry: Arc<dyn PluginRegistry>) -> Router {
    let state = Arc::new(AppState { registry });
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/assets/plugin/{plugin}/path/{*path}",
            get(handlers::plugin_asset),
        )
        .with_state(state)
}
