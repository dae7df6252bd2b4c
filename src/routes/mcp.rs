// ABOUTME: Streamable HTTP endpoint carrying MCP JSON-RPC messages
// ABOUTME: POST one message; requests get a JSON response and notifications get 202 Accepted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! MCP protocol route for the streamable HTTP transport

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tracing::warn;

use crate::jsonrpc::{JsonRpcError, JsonRpcResponse};
use crate::mcp::McpRequestProcessor;

/// MCP routes implementation
pub struct McpRoutes;

impl McpRoutes {
    /// `POST <path>` bound to `processor`
    pub fn routes(path: &str, processor: McpRequestProcessor) -> Router {
        Router::new()
            .route(path, post(handle_mcp_message))
            .with_state(processor)
    }
}

async fn handle_mcp_message(
    State(processor): State<McpRequestProcessor>,
    body: Bytes,
) -> Response {
    let message = match serde_json::from_slice::<Value>(&body) {
        Ok(message) => message,
        Err(e) => {
            warn!("Invalid JSON-RPC body: {e}");
            let response = JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string()));
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };
    if !message.is_object() {
        let response = JsonRpcResponse::error(
            None,
            JsonRpcError::invalid_request("expected a single JSON-RPC message object"),
        );
        return (StatusCode::BAD_REQUEST, Json(response)).into_response();
    }

    match processor.handle_value(message).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}
