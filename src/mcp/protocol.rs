// ABOUTME: MCP protocol message handlers for initialize, discovery, resources and prompts
// ABOUTME: Serves the endpoint matrix and conversation resources and the chat starter prompt
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # MCP Protocol Handlers
//!
//! Handlers for every method that does not call the upstream API. Each
//! returns the `result` value or a [`JsonRpcError`]; the request processor
//! wraps it in a response.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::resources::ServerResources;
use super::schema::{
    get_tools, Content, InitializeResponse, PromptArgument, PromptDescriptor, PromptMessage,
    ResourceContents, ResourceDescriptor, CHAT_COMPLETION, COMPLETION, GET_USER_BALANCE,
    LIST_MODELS,
};
use crate::constants::protocol::mcp_protocol_version;
use crate::jsonrpc::JsonRpcError;

/// URI of the endpoint matrix resource
pub const ENDPOINTS_RESOURCE_URI: &str = "deepseek://api/endpoints";
/// URI of the conversation list resource
pub const CONVERSATIONS_RESOURCE_URI: &str = "deepseek://conversations";
/// Name of the chat starter prompt
pub const CHAT_STARTER_PROMPT: &str = "deepseek_chat_starter";

const JSON_MIME: &str = "application/json";
const DEFAULT_PROMPT_STYLE: &str = "helpful";

/// Upstream endpoint and the tool that exposes it
struct EndpointEntry {
    endpoint: &'static str,
    method: &'static str,
    tool: &'static str,
    description: &'static str,
}

const ENDPOINT_MATRIX: [EndpointEntry; 4] = [
    EndpointEntry {
        endpoint: "/chat/completions",
        method: "POST",
        tool: CHAT_COMPLETION,
        description: "Chat Completions API (streaming and non-streaming)",
    },
    EndpointEntry {
        endpoint: "/completions",
        method: "POST",
        tool: COMPLETION,
        description: "Text/FIM Completions API (streaming and non-streaming)",
    },
    EndpointEntry {
        endpoint: "/models",
        method: "GET",
        tool: LIST_MODELS,
        description: "List available DeepSeek models",
    },
    EndpointEntry {
        endpoint: "/user/balance",
        method: "GET",
        tool: GET_USER_BALANCE,
        description: "Retrieve account balance",
    },
];

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// MCP protocol handlers
pub struct ProtocolHandler;

impl ProtocolHandler {
    /// `initialize`
    #[must_use]
    pub fn handle_initialize() -> Value {
        debug!("Handling initialize request");
        json!(InitializeResponse::new(mcp_protocol_version()))
    }

    /// `ping`
    #[must_use]
    pub fn handle_ping() -> Value {
        json!({})
    }

    /// `tools/list`
    #[must_use]
    pub fn handle_tools_list() -> Value {
        json!({ "tools": get_tools() })
    }

    /// `resources/list`
    #[must_use]
    pub fn handle_resources_list() -> Value {
        let resources = [
            ResourceDescriptor {
                uri: ENDPOINTS_RESOURCE_URI.to_owned(),
                name: "DeepSeek API endpoints".to_owned(),
                description: "Upstream endpoints and the tools that call them".to_owned(),
                mime_type: JSON_MIME.to_owned(),
            },
            ResourceDescriptor {
                uri: CONVERSATIONS_RESOURCE_URI.to_owned(),
                name: "Stored conversations".to_owned(),
                description: "Conversation ids with their message counts".to_owned(),
                mime_type: JSON_MIME.to_owned(),
            },
        ];
        json!({ "resources": resources })
    }

    /// `resources/read`
    ///
    /// # Errors
    ///
    /// Invalid params when `uri` is missing or unknown
    pub fn handle_resources_read(
        params: Option<&Value>,
        resources: &ServerResources,
    ) -> Result<Value, JsonRpcError> {
        let params: ReadResourceParams = parse_params(params)?;
        let body = match params.uri.as_str() {
            ENDPOINTS_RESOURCE_URI => endpoint_matrix(),
            CONVERSATIONS_RESOURCE_URI => {
                json!({ "conversations": resources.conversations.summaries() })
            }
            other => {
                return Err(JsonRpcError::invalid_params(format!(
                    "Unknown resource: {other}"
                )))
            }
        };
        let text = serde_json::to_string_pretty(&body)
            .map_err(|e| JsonRpcError::internal(format!("Failed to serialize resource: {e}")))?;
        let contents = [ResourceContents {
            uri: params.uri,
            mime_type: JSON_MIME.to_owned(),
            text,
        }];
        Ok(json!({ "contents": contents }))
    }

    /// `prompts/list`
    #[must_use]
    pub fn handle_prompts_list() -> Value {
        let argument = |name: &str, description: &str, required: bool| PromptArgument {
            name: name.to_owned(),
            description: description.to_owned(),
            required,
        };
        let prompts = [PromptDescriptor {
            name: CHAT_STARTER_PROMPT.to_owned(),
            description: "Starter message for a DeepSeek chat task".to_owned(),
            arguments: vec![
                argument("task", "What the model should do", true),
                argument("style", "Answer style (default: helpful)", false),
                argument("model", "Model to use (default: server default model)", false),
            ],
        }];
        json!({ "prompts": prompts })
    }

    /// `prompts/get`
    ///
    /// # Errors
    ///
    /// Invalid params for an unknown prompt or a missing `task`
    pub fn handle_prompts_get(
        params: Option<&Value>,
        resources: &ServerResources,
    ) -> Result<Value, JsonRpcError> {
        let params: GetPromptParams = parse_params(params)?;
        if params.name != CHAT_STARTER_PROMPT {
            return Err(JsonRpcError::invalid_params(format!(
                "Unknown prompt: {}",
                params.name
            )));
        }

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let argument = |key: &str| {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .filter(|value| !value.trim().is_empty())
        };
        let task = argument("task")
            .ok_or_else(|| JsonRpcError::invalid_params("Missing required argument 'task'"))?;
        let text = chat_starter_text(
            task,
            argument("style").unwrap_or(DEFAULT_PROMPT_STYLE),
            argument("model").unwrap_or(&resources.default_model),
        );

        let messages = [PromptMessage {
            role: "user".to_owned(),
            content: Content::Text { text },
        }];
        Ok(json!({
            "description": "Starter message for a DeepSeek chat task",
            "messages": messages,
        }))
    }
}

/// Render the chat starter prompt
#[must_use]
pub fn chat_starter_text(task: &str, style: &str, model: &str) -> String {
    format!("Use model: {model}\nStyle: {style}\nTask: {task}")
}

fn endpoint_matrix() -> Value {
    let endpoints: Vec<Value> = ENDPOINT_MATRIX
        .iter()
        .map(|entry| {
            json!({
                "endpoint": entry.endpoint,
                "method": entry.method,
                "tool": entry.tool,
                "description": entry.description,
            })
        })
        .collect();
    json!({ "endpoints": endpoints })
}

fn parse_params<T: DeserializeOwned>(params: Option<&Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params.clone())
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_starter_layout() {
        assert_eq!(
            chat_starter_text("sum a list", "terse", "deepseek-chat"),
            "Use model: deepseek-chat\nStyle: terse\nTask: sum a list"
        );
    }

    #[test]
    fn test_endpoint_matrix_names_existing_tools() {
        let tools: Vec<String> = get_tools().into_iter().map(|tool| tool.name).collect();
        for entry in &ENDPOINT_MATRIX {
            assert!(tools.iter().any(|name| name == entry.tool), "{}", entry.tool);
        }
    }
}
