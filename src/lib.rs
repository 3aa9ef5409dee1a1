//! Calculator -- arithmetic over HTTP with a bounded invocation history.
//!
//! This crate provides the operation executor, the history ledger, the
//! service tying them together, and the axum adapter that exposes them.

pub mod api;
pub mod calc;
pub mod config;
pub mod history;
pub mod service;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::state::AppState;
use crate::config::Config;
use crate::service::Calculator;

/// Start the HTTP server and run until Ctrl-C.
pub async fn serve(config: Config) -> Result<()> {
    let max_history = config.history.effective_max_history();
    let service = Arc::new(Calculator::with_max_history(max_history));
    let state = AppState::new(service).with_body_limit(config.server.request_body_limit);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.server.bind))?;
    let app = api::router(state);

    tracing::info!(%addr, max_history, "calculator listening");
    tracing::info!("health check: http://{addr}/health");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("calculator stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    }
}
