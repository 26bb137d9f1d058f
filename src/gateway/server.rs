use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::api::{self, AppState, SharedState};
use super::github::USER_AGENT;
use crate::config::GatewayConfig;

/// Bind address and mode for the gateway server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub dev_mode: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3141,
            dev_mode: false,
        }
    }
}

/// Shared state with an outbound HTTP client bounded by the upstream timeout.
pub fn build_state(config: GatewayConfig) -> Result<SharedState> {
    let http = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.upstream_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    Ok(Arc::new(AppState::new(config, http)))
}

/// Build the full application router with request tracing.
pub fn build_router(state: SharedState, dev_mode: bool) -> Router {
    let mut app = api::api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if dev_mode {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// Start the gateway server.
pub async fn start_server(server: ServerConfig, config: GatewayConfig) -> Result<()> {
    let missing = config.missing_request_time_vars();
    if !missing.is_empty() {
        tracing::warn!(
            missing = %missing.join(", "),
            "GitHub settings incomplete; affected requests will fail"
        );
    }

    let state = build_state(config)?;
    let app = build_router(state, server.dev_mode);

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    info!(%local_addr, dev_mode = server.dev_mode, "flowgate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
