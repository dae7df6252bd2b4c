// ABOUTME: DeepSeek API data model and client abstraction
// ABOUTME: Request/response records with extension bags, execution results and the DeepSeekApi trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # DeepSeek API Layer
//!
//! Typed records for the DeepSeek chat and text completion endpoints plus the
//! [`DeepSeekApi`] trait implemented by [`DeepSeekClient`].
//!
//! Upstream payloads gain and lose fields between provider versions, so every
//! record keeps a well-defined required core and an `extra` map that is
//! flattened on the wire. Unknown fields survive a deserialize/serialize
//! round-trip untouched.
//!
//! Streaming is an execution detail of the client: a streamed call is folded
//! into the same response record a non-streamed call returns.

/// Stream chunk folding for chat and text completions
pub mod aggregation;
/// HTTP client for the DeepSeek API
pub mod deepseek;
/// Line-buffering server-sent-events parser
pub mod sse_parser;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use aggregation::{aggregate_chat_chunks, aggregate_completion_chunks};
pub use deepseek::{DeepSeekClient, DeepSeekClientConfig};
pub use sse_parser::{SseEvent, SseLineBuffer};

use crate::errors::ApiError;

/// Forward-compatible passthrough fields
pub type Extra = Map<String, Value>;

// ============================================================================
// Messages
// ============================================================================

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
    /// Tool call result
    Tool,
}

impl MessageRole {
    /// Wire name of the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Message content: plain text or structured parts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text
    Text(String),
    /// Structured content parts, passed through verbatim
    Parts(Vec<Value>),
}

impl MessageContent {
    /// Text content, if this is the plain-text form
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Parts(_) => None,
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author role
    pub role: MessageRole,
    /// Text or structured content; absent for assistant tool-call turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
    /// Optional participant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool call this message answers (role `tool`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Reasoner chain-of-thought output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    /// Tool calls requested by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

impl ChatMessage {
    /// Create a message with text content
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(MessageContent::Text(content.into())),
            name: None,
            tool_call_id: None,
            reasoning_content: None,
            tool_calls: None,
            extra: Extra::new(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Text content, if any
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(MessageContent::as_text)
    }
}

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier
    #[serde(default)]
    pub id: String,
    /// Call type, always `function` today
    #[serde(rename = "type", default = "default_tool_call_type")]
    pub call_type: String,
    /// Function name and JSON-encoded arguments
    #[serde(default)]
    pub function: FunctionCall,
}

fn default_tool_call_type() -> String {
    "function".to_owned()
}

/// Function name and arguments of a tool call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    #[serde(default)]
    pub name: String,
    /// JSON-encoded arguments
    #[serde(default)]
    pub arguments: String,
}

// ============================================================================
// Requests
// ============================================================================

/// Request body for `POST /chat/completions`
///
/// Only `model` and `messages` are required. Every other field is passed to
/// the upstream verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// Model identifier
    pub model: String,
    /// Conversation so far, in order
    pub messages: Vec<ChatMessage>,
    /// Stream the response as server-sent events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Passthrough fields (`stop`, `tools`, `response_format`, `thinking`, ...)
    #[serde(flatten)]
    pub extra: Extra,
}

impl ChatCompletionRequest {
    /// Create a request for a model and message list
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            stream: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
            extra: Extra::new(),
        }
    }

    /// Enable or disable streaming
    #[must_use]
    pub const fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Whether the caller asked for a streamed response
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

/// Request body for `POST /completions` (text and fill-in-the-middle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Prompt text
    pub prompt: String,
    /// Text after the insertion point (FIM)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    /// Stream the response as server-sent events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Nucleus sampling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

impl CompletionRequest {
    /// Create a request for a model and prompt
    #[must_use]
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            suffix: None,
            stream: None,
            temperature: None,
            top_p: None,
            max_tokens: None,
            extra: Extra::new(),
        }
    }

    /// Enable or disable streaming
    #[must_use]
    pub const fn with_streaming(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Set the FIM suffix
    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Whether the caller asked for a streamed response
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Token accounting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Generated tokens
    #[serde(default)]
    pub completion_tokens: u64,
    /// Sum of prompt and generated tokens
    #[serde(default)]
    pub total_tokens: u64,
    /// Provider-specific counters (cache hits, reasoning tokens, ...)
    #[serde(flatten)]
    pub extra: Extra,
}

/// One choice of a chat completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Assistant message
    pub message: ChatMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

/// Normalized chat completion, identical for streamed and non-streamed calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Completion identifier
    #[serde(default)]
    pub id: String,
    /// Object type, `chat.completion`
    #[serde(default)]
    pub object: String,
    /// Unix timestamp in seconds
    #[serde(default)]
    pub created: i64,
    /// Model that produced the completion
    #[serde(default)]
    pub model: String,
    /// Generated choices
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

impl ChatCompletionResponse {
    /// The assistant message of the first choice
    #[must_use]
    pub fn first_message(&self) -> Option<&ChatMessage> {
        self.choices.first().map(|choice| &choice.message)
    }
}

/// One choice of a text completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Generated text
    #[serde(default)]
    pub text: String,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

/// Normalized text completion, identical for streamed and non-streamed calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextCompletionResponse {
    /// Completion identifier
    #[serde(default)]
    pub id: String,
    /// Object type, `text_completion`
    #[serde(default)]
    pub object: String,
    /// Unix timestamp in seconds
    #[serde(default)]
    pub created: i64,
    /// Model that produced the completion
    #[serde(default)]
    pub model: String,
    /// Generated choices
    #[serde(default)]
    pub choices: Vec<TextChoice>,
    /// Token usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

/// A model advertised by `GET /models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier
    pub id: String,
    /// Object type, `model`
    #[serde(default)]
    pub object: String,
    /// Owning organization
    #[serde(default)]
    pub owned_by: String,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

/// Response of `GET /models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelList {
    /// Object type, `list`
    #[serde(default)]
    pub object: String,
    /// Available models
    #[serde(default)]
    pub data: Vec<ModelInfo>,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

/// Balance in one currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceInfo {
    /// Currency code
    #[serde(default)]
    pub currency: String,
    /// Total available balance
    #[serde(default)]
    pub total_balance: String,
    /// Granted (promotional) balance
    #[serde(default)]
    pub granted_balance: String,
    /// Topped-up balance
    #[serde(default)]
    pub topped_up_balance: String,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

/// Response of `GET /user/balance`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalance {
    /// Whether the balance covers API calls
    #[serde(default)]
    pub is_available: bool,
    /// Per-currency balances
    #[serde(default)]
    pub balance_infos: Vec<BalanceInfo>,
    /// Passthrough fields
    #[serde(flatten)]
    pub extra: Extra,
}

// ============================================================================
// Execution Results
// ============================================================================

/// Record of a reasoner call that was retried with a substitute model
///
/// `reason` is the upstream error message and is meant for humans only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackMetadata {
    /// Model that failed
    pub from_model: String,
    /// Model that answered
    pub to_model: String,
    /// Upstream error message of the failed call
    pub reason: String,
}

/// Outcome of [`DeepSeekApi::create_chat_completion`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionExecutionResult {
    /// Normalized response
    pub response: ChatCompletionResponse,
    /// Present only when the fallback model answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackMetadata>,
    /// Number of folded chunks when the call was streamed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_chunk_count: Option<usize>,
}

/// Outcome of [`DeepSeekApi::create_completion`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionExecutionResult {
    /// Normalized response
    pub response: TextCompletionResponse,
    /// Whether the answer came from the beta endpoint family
    #[serde(default)]
    pub used_beta_base: bool,
    /// Number of folded chunks when the call was streamed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_chunk_count: Option<usize>,
}

// ============================================================================
// Client Trait
// ============================================================================

/// Operations the tool dispatcher needs from the DeepSeek API
#[async_trait]
pub trait DeepSeekApi: Send + Sync {
    /// Run a chat completion, applying reasoner fallback when eligible
    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionExecutionResult, ApiError>;

    /// Run a text completion, retrying once on the beta base when required
    async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionExecutionResult, ApiError>;

    /// List available models
    async fn list_models(&self) -> Result<ModelList, ApiError>;

    /// Fetch the account balance
    async fn get_user_balance(&self) -> Result<UserBalance, ApiError>;
}
