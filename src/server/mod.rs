//! HTTP and WebSocket surface over one owner's board.
//!
//! The JSON routes mirror the board controller; `/ws` pushes the same
//! snapshots the terminal board receives.

pub mod api;
pub mod origin;
pub mod ws;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, middleware, routing::get};
use tower_http::cors::CorsLayer;

use quadrant_common::Identity;

use crate::store::TaskStore;
use api::AppState;

pub const DEFAULT_PORT: u16 = 7878;

/// Configuration for the board server.
pub struct ServerConfig {
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            dev_mode: false,
        }
    }
}

/// Build the full application router with API and WebSocket routes.
/// Outside dev mode every route only answers same-origin browsers.
pub fn build_router(state: Arc<AppState>, dev_mode: bool) -> Router {
    let app = api::api_router()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);
    if dev_mode {
        app
    } else {
        app.layer(middleware::from_fn(origin::same_origin_only))
    }
}

/// Serve `owner`'s board until Ctrl+C.
pub async fn start_server(
    config: ServerConfig,
    store: Arc<dyn TaskStore>,
    owner: Identity,
) -> Result<()> {
    let label = owner.display_label().to_string();
    let state = Arc::new(AppState { store, owner });

    let mut app = build_router(state, config.dev_mode);

    if config.dev_mode {
        app = app.layer(CorsLayer::permissive());
    }

    let host = if config.dev_mode { "0.0.0.0" } else { "127.0.0.1" };
    let addr = format!("{}:{}", host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, dev = config.dev_mode, "board server listening");
    println!("Serving {}'s board at http://{}", label, local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}
