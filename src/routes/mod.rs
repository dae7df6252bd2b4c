// ABOUTME: HTTP route assembly and server startup for the streamable HTTP transport
// ABOUTME: Merges the MCP endpoint with the health check and adds request tracing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for the DeepSeek MCP server

/// Health check route
pub mod health;
/// MCP JSON-RPC endpoint
pub mod mcp;

pub use health::HealthRoutes;
pub use mcp::McpRoutes;

use std::future;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::TransportConfig;
use crate::errors::{AppError, AppResult};
use crate::mcp::McpRequestProcessor;

/// Build the full HTTP router
pub fn router(config: &TransportConfig, processor: McpRequestProcessor) -> Router {
    Router::new()
        .merge(McpRoutes::routes(&config.http_path, processor))
        .merge(HealthRoutes::routes())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve the HTTP transport until Ctrl-C
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails
pub async fn serve(config: &TransportConfig, processor: McpRequestProcessor) -> AppResult<()> {
    let address = format!("{}:{}", config.http_host, config.http_port);
    let listener = TcpListener::bind(&address).await.map_err(|e| {
        AppError::internal(format!("Failed to bind {address}: {e}")).with_source(e)
    })?;
    info!(
        "MCP streamable HTTP transport listening on http://{address}{}",
        config.http_path
    );

    axum::serve(listener, router(config, processor))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("HTTP server failed: {e}")).with_source(e))
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Failed to listen for shutdown signal: {e}");
            future::pending::<()>().await;
        }
    }
}
