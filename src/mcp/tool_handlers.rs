// ABOUTME: Tool execution handlers for MCP tools/call requests
// ABOUTME: Maps tool arguments onto DeepSeek API requests and conversation store operations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Tool Dispatcher
//!
//! Every tool failure is reported as a tool result with `isError: true`, never
//! as a JSON-RPC error, so the calling model can read and react to it. Only a
//! malformed `tools/call` envelope or an unknown tool name is a protocol error.

use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::field::Empty;
use tracing::{debug, warn, Span};

use super::resources::ServerResources;
use super::schema::{
    ToolResponse, CHAT_COMPLETION, CLEAR_CONVERSATION, COMPLETION, GET_CONVERSATION,
    GET_USER_BALANCE, LIST_CONVERSATIONS, LIST_MODELS,
};
use crate::errors::{AppError, AppResult};
use crate::jsonrpc::JsonRpcError;
use crate::llm::{ChatCompletionRequest, ChatMessage, CompletionRequest};
use crate::logging::AppLogger;

const RETRIABLE_GUIDANCE: &str =
    "This looks transient (rate limit, overload or network). Retrying the same call later may succeed.";
const PERMANENT_GUIDANCE: &str =
    "Retrying will not help. Check the arguments, the model name and the API key.";
const INVALID_ARGUMENTS_GUIDANCE: &str = "Fix the tool arguments and call again.";

/// Envelope of a `tools/call` request
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionArgs {
    messages: Vec<ChatMessage>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stream: bool,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    top_p: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    max_completion_tokens: Option<u32>,
    #[serde(default)]
    stop: Option<Value>,
    #[serde(default)]
    response_format: Option<Value>,
    #[serde(default)]
    tools: Option<Value>,
    #[serde(default)]
    tool_choice: Option<Value>,
    #[serde(default)]
    thinking: Option<Value>,
    #[serde(default)]
    extra_body: Option<Map<String, Value>>,
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionArgs {
    prompt: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    stream: bool,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    top_p: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    stop: Option<Value>,
    #[serde(default)]
    extra_body: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ConversationArgs {
    conversation_id: String,
}

/// Tool execution handlers for MCP protocol
pub struct ToolHandlers;

impl ToolHandlers {
    /// Handle a `tools/call` request
    ///
    /// # Errors
    ///
    /// Invalid params when the envelope is malformed or the tool is unknown.
    /// Tool failures are returned as `Ok` results with `isError: true`.
    #[tracing::instrument(
        skip_all,
        fields(tool_name = Empty, success = Empty, duration_ms = Empty)
    )]
    pub async fn handle_tools_call(
        params: Option<&Value>,
        resources: &ServerResources,
    ) -> Result<Value, JsonRpcError> {
        let params = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing parameters for tools/call"))?;
        let call: ToolCallParams = serde_json::from_value(params.clone())
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {e}")))?;
        if !is_known_tool(&call.name) {
            return Err(JsonRpcError::invalid_params(format!(
                "Unknown tool: {}",
                call.name
            )));
        }

        Span::current().record("tool_name", call.name.as_str());
        let started = Instant::now();
        let arguments = match call.arguments {
            Some(Value::Null) | None => json!({}),
            Some(arguments) => arguments,
        };

        let outcome = Self::execute_tool(&call.name, arguments, resources).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        Span::current()
            .record("success", outcome.is_ok())
            .record("duration_ms", duration_ms);
        AppLogger::log_mcp_tool_call(&call.name, outcome.is_ok(), duration_ms);

        let response = match outcome {
            Ok(value) => ToolResponse::json(value),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                ToolResponse::error(format_tool_error(&e))
            }
        };
        serde_json::to_value(response)
            .map_err(|e| JsonRpcError::internal(format!("Failed to serialize tool result: {e}")))
    }

    async fn execute_tool(
        name: &str,
        arguments: Value,
        resources: &ServerResources,
    ) -> AppResult<Value> {
        debug!(tool = name, "Executing tool");
        match name {
            LIST_MODELS => Ok(serde_json::to_value(resources.api.list_models().await?)?),
            GET_USER_BALANCE => Ok(serde_json::to_value(
                resources.api.get_user_balance().await?,
            )?),
            CHAT_COMPLETION => Self::chat_completion(parse_args(name, arguments)?, resources).await,
            COMPLETION => Self::completion(parse_args(name, arguments)?, resources).await,
            LIST_CONVERSATIONS => Ok(json!({
                "conversations": resources.conversations.summaries()
            })),
            GET_CONVERSATION => {
                let args: ConversationArgs = parse_args(name, arguments)?;
                let messages = resources.conversations.get(&args.conversation_id);
                Ok(json!({
                    "conversation_id": args.conversation_id,
                    "message_count": messages.len(),
                    "messages": messages,
                }))
            }
            CLEAR_CONVERSATION => {
                let args: ConversationArgs = parse_args(name, arguments)?;
                let cleared = resources.conversations.clear(&args.conversation_id);
                Ok(json!({
                    "conversation_id": args.conversation_id,
                    "cleared": cleared,
                }))
            }
            other => Err(AppError::not_found(format!("tool '{other}'"))),
        }
    }

    async fn chat_completion(
        args: ChatCompletionArgs,
        resources: &ServerResources,
    ) -> AppResult<Value> {
        if args.messages.is_empty() {
            return Err(AppError::invalid_input(
                "messages must contain at least one message",
            ));
        }
        let conversation_id = args
            .conversation_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_owned);

        let mut messages = conversation_id
            .as_deref()
            .map(|id| resources.conversations.get(id))
            .unwrap_or_default();
        messages.extend(args.messages.iter().cloned());

        let mut body = Map::new();
        body.insert(
            "model".into(),
            json!(resolve_model(args.model, &resources.default_model)),
        );
        body.insert("messages".into(), serde_json::to_value(&messages)?);
        body.insert("stream".into(), json!(args.stream));
        insert_optional(&mut body, "temperature", args.temperature);
        insert_optional(&mut body, "top_p", args.top_p);
        insert_optional(&mut body, "max_tokens", args.max_tokens);
        insert_optional(&mut body, "max_completion_tokens", args.max_completion_tokens);
        insert_optional(&mut body, "stop", args.stop);
        insert_optional(&mut body, "response_format", args.response_format);
        insert_optional(&mut body, "tools", args.tools);
        insert_optional(&mut body, "tool_choice", args.tool_choice);
        insert_optional(&mut body, "thinking", args.thinking);
        merge_extra_body(&mut body, args.extra_body);
        let request: ChatCompletionRequest = build_request(body)?;

        let result = resources.api.create_chat_completion(request).await?;

        let mut value = serde_json::to_value(&result)?;
        if let Some(id) = conversation_id {
            let reply = result.response.first_message().cloned().map(|mut reply| {
                // Upstream rejects reasoning_content in request messages
                reply.reasoning_content = None;
                reply
            });
            resources
                .conversations
                .append(&id, args.messages.into_iter().chain(reply));
            if let Value::Object(map) = &mut value {
                map.insert(
                    "conversation".into(),
                    json!({
                        "conversation_id": id,
                        "message_count": resources.conversations.get(&id).len(),
                    }),
                );
            }
        }
        Ok(value)
    }

    async fn completion(args: CompletionArgs, resources: &ServerResources) -> AppResult<Value> {
        let mut body = Map::new();
        body.insert(
            "model".into(),
            json!(resolve_model(args.model, &resources.default_model)),
        );
        body.insert("prompt".into(), json!(args.prompt));
        body.insert("stream".into(), json!(args.stream));
        insert_optional(&mut body, "suffix", args.suffix);
        insert_optional(&mut body, "temperature", args.temperature);
        insert_optional(&mut body, "top_p", args.top_p);
        insert_optional(&mut body, "max_tokens", args.max_tokens);
        insert_optional(&mut body, "stop", args.stop);
        merge_extra_body(&mut body, args.extra_body);
        let request: CompletionRequest = build_request(body)?;

        let result = resources.api.create_completion(request).await?;
        Ok(serde_json::to_value(result)?)
    }
}

/// Whether `name` is one of the tools listed by `tools/list`
#[must_use]
pub fn is_known_tool(name: &str) -> bool {
    matches!(
        name,
        LIST_MODELS
            | GET_USER_BALANCE
            | CHAT_COMPLETION
            | COMPLETION
            | LIST_CONVERSATIONS
            | GET_CONVERSATION
            | CLEAR_CONVERSATION
    )
}

/// Render a failed tool call as `ERROR: <message>` plus retry guidance
#[must_use]
pub fn format_tool_error(error: &AppError) -> String {
    let guidance = match error.api_error() {
        Some(api) if api.is_retriable() => RETRIABLE_GUIDANCE,
        Some(_) => PERMANENT_GUIDANCE,
        None => INVALID_ARGUMENTS_GUIDANCE,
    };
    let message = error
        .api_error()
        .map_or_else(|| error.message.clone(), ToString::to_string);
    format!("ERROR: {message}\n{guidance}")
}

fn resolve_model(requested: Option<String>, default_model: &str) -> String {
    requested
        .map(|model| model.trim().to_owned())
        .filter(|model| !model.is_empty())
        .unwrap_or_else(|| default_model.to_owned())
}

fn insert_optional<T: Into<Value>>(body: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        body.insert(key.to_owned(), value.into());
    }
}

/// `extra_body` keys override the named arguments
fn merge_extra_body(body: &mut Map<String, Value>, extra_body: Option<Map<String, Value>>) {
    if let Some(extra_body) = extra_body {
        body.extend(extra_body);
    }
}

fn build_request<T: DeserializeOwned>(body: Map<String, Value>) -> AppResult<T> {
    serde_json::from_value(Value::Object(body))
        .map_err(|e| AppError::invalid_input(format!("invalid request body: {e}")).with_source(e))
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> AppResult<T> {
    serde_json::from_value(arguments).map_err(|e| {
        AppError::invalid_input(format!("invalid arguments for {tool}: {e}")).with_source(e)
    })
}
