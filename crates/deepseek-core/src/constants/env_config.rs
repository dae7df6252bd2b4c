// ABOUTME: Environment variable names consumed by the server configuration
// ABOUTME: Single place to look up every knob the server reads from the environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Bearer credential for the DeepSeek API
pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";
/// Upstream base URL
pub const DEEPSEEK_BASE_URL: &str = "DEEPSEEK_BASE_URL";
/// Per-request deadline in milliseconds
pub const DEEPSEEK_REQUEST_TIMEOUT_MS: &str = "DEEPSEEK_REQUEST_TIMEOUT_MS";
/// Default model for tool calls
pub const DEEPSEEK_DEFAULT_MODEL: &str = "DEEPSEEK_DEFAULT_MODEL";
/// Reasoner fallback switch
pub const DEEPSEEK_ENABLE_REASONER_FALLBACK: &str = "DEEPSEEK_ENABLE_REASONER_FALLBACK";
/// Reasoner fallback model
pub const DEEPSEEK_FALLBACK_MODEL: &str = "DEEPSEEK_FALLBACK_MODEL";
/// User agent sent upstream
pub const DEEPSEEK_USER_AGENT: &str = "DEEPSEEK_USER_AGENT";
/// Conversation history cap
pub const CONVERSATION_MAX_MESSAGES: &str = "CONVERSATION_MAX_MESSAGES";
/// Transport selection (`stdio` or `streamable-http`)
pub const MCP_TRANSPORT: &str = "MCP_TRANSPORT";
/// HTTP transport bind host
pub const MCP_HTTP_HOST: &str = "MCP_HTTP_HOST";
/// HTTP transport bind port
pub const MCP_HTTP_PORT: &str = "MCP_HTTP_PORT";
/// HTTP transport MCP endpoint path
pub const MCP_HTTP_PATH: &str = "MCP_HTTP_PATH";
/// MCP protocol version override
pub const MCP_PROTOCOL_VERSION: &str = "MCP_PROTOCOL_VERSION";
