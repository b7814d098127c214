//! HTTP gateway
//!
//! Hosts the Stripe webhook and the health probe.

pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{any, get},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::GatewayConfig;
use crate::webhook::stripe_webhook;
use state::AppState;

/// Build the router. The webhook route accepts every method so non-POST
/// requests get the JSON 405 body instead of axum's empty one.
pub fn build_router(state: Arc<AppState>, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, any(stripe_webhook))
        .route("/api/v1/health", get(handlers::health_check))
        .with_state(state)
}

/// Serve until Ctrl-C
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state, &config.webhook_path);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Gateway listening on http://{}", addr);
    info!("Stripe webhook endpoint: POST {}", config.webhook_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl-C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
