// ABOUTME: MCP protocol schema definitions for tools, resources, prompts and tool results
// ABOUTME: Declares the DeepSeek tool catalog with JSON Schemas for every tool argument
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! MCP Protocol Schema Definitions
//!
//! Type-safe records for the MCP messages this server emits, plus the tool
//! catalog returned by `tools/list`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::constants::protocol::{SERVER_NAME, SERVER_VERSION};

// ============================================================================
// Tool names
// ============================================================================

/// `GET /models` passthrough
pub const LIST_MODELS: &str = "list_models";
/// `GET /user/balance` passthrough
pub const GET_USER_BALANCE: &str = "get_user_balance";
/// `POST /chat/completions`
pub const CHAT_COMPLETION: &str = "chat_completion";
/// `POST /completions`
pub const COMPLETION: &str = "completion";
/// List stored conversations
pub const LIST_CONVERSATIONS: &str = "list_conversations";
/// Read one stored conversation
pub const GET_CONVERSATION: &str = "get_conversation";
/// Drop one stored conversation
pub const CLEAR_CONVERSATION: &str = "clear_conversation";

// ============================================================================
// Initialize
// ============================================================================

/// Server information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

/// Capability flag with `listChanged`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListChangedCapability {
    /// Whether the server emits list change notifications
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// MCP server capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tool support
    pub tools: ListChangedCapability,
    /// Resource support
    pub resources: ListChangedCapability,
    /// Prompt support
    pub prompts: ListChangedCapability,
}

/// Result of `initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    /// Negotiated protocol version
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server identity
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
    /// Supported features
    pub capabilities: ServerCapabilities,
    /// Usage hint for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl InitializeResponse {
    /// Build the initialize result for a protocol version
    #[must_use]
    pub fn new(protocol_version: String) -> Self {
        let fixed = || ListChangedCapability {
            list_changed: false,
        };
        Self {
            protocol_version,
            server_info: ServerInfo {
                name: SERVER_NAME.to_owned(),
                version: SERVER_VERSION.to_owned(),
            },
            capabilities: ServerCapabilities {
                tools: fixed(),
                resources: fixed(),
                prompts: fixed(),
            },
            instructions: Some(
                "Tools map one-to-one onto the DeepSeek API. Pass `conversation_id` to \
                 `chat_completion` to keep history between calls."
                    .to_owned(),
            ),
        }
    }
}

// ============================================================================
// Tools
// ============================================================================

/// MCP tool schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema of the arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolSchema {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            input_schema,
        }
    }
}

/// Tool response after execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Content blocks
    pub content: Vec<Content>,
    /// Whether the tool failed
    #[serde(rename = "isError")]
    pub is_error: bool,
    /// Machine-readable result
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl ToolResponse {
    /// Successful result carrying `value` both as pretty text and structured content
    #[must_use]
    pub fn json(value: Value) -> Self {
        let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
        Self {
            content: vec![Content::Text { text }],
            is_error: false,
            structured_content: Some(value),
        }
    }

    /// Failed result with a text explanation
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: true,
            structured_content: None,
        }
    }
}

/// Content types for MCP messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    /// Plain text
    #[serde(rename = "text")]
    Text {
        /// Text body
        text: String,
    },
}

// ============================================================================
// Resources and prompts
// ============================================================================

/// Entry of `resources/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Resource URI
    pub uri: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Content type of `resources/read`
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

/// Entry of `resources/read`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContents {
    /// Resource URI
    pub uri: String,
    /// Content type
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Serialized body
    pub text: String,
}

/// Argument of a prompt template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name
    pub name: String,
    /// Description
    pub description: String,
    /// Whether `prompts/get` fails without it
    pub required: bool,
}

/// Entry of `prompts/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDescriptor {
    /// Prompt name
    pub name: String,
    /// Description
    pub description: String,
    /// Template arguments
    pub arguments: Vec<PromptArgument>,
}

/// Message produced by `prompts/get`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Author role
    pub role: String,
    /// Message body
    pub content: Content,
}

// ============================================================================
// Tool catalog
// ============================================================================

/// Get all available tools
#[must_use]
pub fn get_tools() -> Vec<ToolSchema> {
    vec![
        ToolSchema::new(
            LIST_MODELS,
            "List the models available to the configured DeepSeek account",
            empty_object_schema(),
        ),
        ToolSchema::new(
            GET_USER_BALANCE,
            "Retrieve the DeepSeek account balance",
            empty_object_schema(),
        ),
        create_chat_completion_tool(),
        create_completion_tool(),
        ToolSchema::new(
            LIST_CONVERSATIONS,
            "List stored conversation ids with their message counts",
            empty_object_schema(),
        ),
        ToolSchema::new(
            GET_CONVERSATION,
            "Return the stored messages of a conversation",
            conversation_id_schema(),
        ),
        ToolSchema::new(
            CLEAR_CONVERSATION,
            "Delete the stored history of a conversation",
            conversation_id_schema(),
        ),
    ]
}

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn conversation_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "conversation_id": { "type": "string", "description": "Conversation identifier" }
        },
        "required": ["conversation_id"]
    })
}

fn create_chat_completion_tool() -> ToolSchema {
    ToolSchema::new(
        CHAT_COMPLETION,
        "Create a chat completion. Streamed responses are aggregated before returning. \
         Reasoner calls that fail transiently are retried with the fallback model.",
        json!({
            "type": "object",
            "properties": {
                "messages": {
                    "type": "array",
                    "description": "Chat messages ({role, content}) in order",
                    "items": { "type": "object" },
                    "minItems": 1
                },
                "model": { "type": "string", "description": "Model id; defaults to the server default model" },
                "stream": { "type": "boolean", "default": false },
                "temperature": { "type": "number" },
                "top_p": { "type": "number" },
                "max_tokens": { "type": "integer", "minimum": 1 },
                "max_completion_tokens": { "type": "integer", "minimum": 1 },
                "stop": { "type": ["string", "array"] },
                "response_format": { "type": "object" },
                "tools": { "type": "array", "items": { "type": "object" } },
                "tool_choice": { "type": ["string", "object"] },
                "thinking": { "type": "object" },
                "extra_body": { "type": "object", "description": "Extra fields merged into the request body" },
                "conversation_id": { "type": "string", "description": "Keep history under this id" }
            },
            "required": ["messages"]
        }),
    )
}

fn create_completion_tool() -> ToolSchema {
    ToolSchema::new(
        COMPLETION,
        "Create a text or fill-in-the-middle completion. Retries once on the beta endpoint \
         when the API requires it.",
        json!({
            "type": "object",
            "properties": {
                "prompt": { "type": "string" },
                "model": { "type": "string", "description": "Model id; defaults to the server default model" },
                "stream": { "type": "boolean", "default": false },
                "suffix": { "type": "string", "description": "Text after the completion (FIM)" },
                "temperature": { "type": "number" },
                "top_p": { "type": "number" },
                "max_tokens": { "type": "integer", "minimum": 1 },
                "stop": { "type": ["string", "array"] },
                "extra_body": { "type": "object", "description": "Extra fields merged into the request body" }
            },
            "required": ["prompt"]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_are_unique() {
        let tools = get_tools();
        let mut names: Vec<_> = tools.iter().map(|tool| tool.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_tool_response_serializes_mcp_field_names() {
        let value = serde_json::to_value(ToolResponse::error("ERROR: boom")).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
        assert!(value.get("structuredContent").is_none());
    }
}
