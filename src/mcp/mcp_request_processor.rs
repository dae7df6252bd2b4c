// ABOUTME: MCP request processing shared by the stdio and streamable HTTP transports
// ABOUTME: Validates JSON-RPC envelopes, routes methods to handlers and suppresses notification replies
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, warn};

use super::protocol::ProtocolHandler;
use super::resources::ServerResources;
use super::tool_handlers::ToolHandlers;
use crate::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};

/// Longest params preview written to debug logs
const PARAMS_PREVIEW_LEN: usize = 100;

/// Processes MCP protocol requests with validation, routing, and execution
#[derive(Clone)]
pub struct McpRequestProcessor {
    resources: Arc<ServerResources>,
}

impl McpRequestProcessor {
    /// Create a new MCP request processor
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Shared resources
    #[must_use]
    pub const fn resources(&self) -> &Arc<ServerResources> {
        &self.resources
    }

    /// Handle one raw JSON message
    ///
    /// Returns `None` for notifications. A value that is not a request object
    /// is answered with `-32600` and a `null` id.
    pub async fn handle_value(&self, message: Value) -> Option<JsonRpcResponse> {
        let id = message.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(message) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!("Invalid JSON-RPC request: {e}");
                Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(e.to_string()),
                ))
            }
        }
    }

    /// Handle an MCP request and return a response
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let started = Instant::now();
        Self::log_request(&request);

        if request.is_notification() {
            Self::handle_notification(&request);
            Self::log_completion("notification", started);
            return None;
        }

        let id = request.id.clone();
        let response = match self.process_request(&request).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                debug!(
                    method = %request.method,
                    code = error.code,
                    message = %error.message,
                    "MCP request failed"
                );
                JsonRpcResponse::error(id, error)
            }
        };
        Self::log_completion("request", started);
        Some(response)
    }

    async fn process_request(&self, request: &JsonRpcRequest) -> Result<Value, JsonRpcError> {
        Self::validate_request(request)?;
        let params = request.params.as_ref();

        match request.method.as_str() {
            "initialize" => Ok(ProtocolHandler::handle_initialize()),
            "ping" => Ok(ProtocolHandler::handle_ping()),
            "tools/list" => Ok(ProtocolHandler::handle_tools_list()),
            "tools/call" => ToolHandlers::handle_tools_call(params, &self.resources).await,
            "resources/list" => Ok(ProtocolHandler::handle_resources_list()),
            "resources/read" => ProtocolHandler::handle_resources_read(params, &self.resources),
            "prompts/list" => Ok(ProtocolHandler::handle_prompts_list()),
            "prompts/get" => ProtocolHandler::handle_prompts_get(params, &self.resources),
            method => {
                warn!("Unknown MCP method: {method}");
                Err(JsonRpcError::method_not_found(method))
            }
        }
    }

    fn validate_request(request: &JsonRpcRequest) -> Result<(), JsonRpcError> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Err(JsonRpcError::invalid_request(format!(
                "got jsonrpc '{}', expected '{JSONRPC_VERSION}'",
                request.jsonrpc
            )));
        }
        if request.method.is_empty() {
            return Err(JsonRpcError::invalid_request("missing method"));
        }
        Ok(())
    }

    fn handle_notification(request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => debug!("Client finished initialization"),
            "notifications/cancelled" => {
                debug!(params = ?request.params, "Client cancelled a request");
            }
            other => debug!("Ignoring notification: {other}"),
        }
    }

    fn log_request(request: &JsonRpcRequest) {
        debug!(
            mcp_method = %request.method,
            mcp_id = ?request.id,
            mcp_params_preview = ?request.params.as_ref().map(|params| {
                let text = params.to_string();
                match text.char_indices().nth(PARAMS_PREVIEW_LEN) {
                    Some((cut, _)) => format!("{}...[truncated]", &text[..cut]),
                    None => text,
                }
            }),
            "Received MCP request"
        );
    }

    fn log_completion(kind: &str, started: Instant) {
        debug!(
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(0),
            "Completed MCP {kind} processing"
        );
    }
}
