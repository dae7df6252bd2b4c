// ABOUTME: Default configuration values for the DeepSeek client and MCP transports
// ABOUTME: Used when the corresponding environment variable is unset or blank
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Upstream API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";

/// Per-request deadline in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Connection establishment deadline in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Model used when a tool call does not name one
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// The only model eligible for automatic fallback
pub const REASONER_MODEL: &str = "deepseek-reasoner";

/// Substitute model used when the reasoner fails transiently
pub const DEFAULT_FALLBACK_MODEL: &str = "deepseek-chat";

/// Path segment of the beta endpoint family
pub const BETA_PATH: &str = "/beta";

/// Maximum number of messages kept per conversation
pub const DEFAULT_CONVERSATION_MAX_MESSAGES: usize = 200;

/// Default bind host for the streamable HTTP transport
pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";

/// Default port for the streamable HTTP transport
pub const DEFAULT_HTTP_PORT: u16 = 3001;

/// Default MCP endpoint path for the streamable HTTP transport
pub const DEFAULT_HTTP_PATH: &str = "/mcp";
