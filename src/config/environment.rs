// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Parses DeepSeek, conversation and transport settings with strict value validation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Environment-based configuration
//!
//! Unset or blank variables fall back to defaults. Values that are present
//! but unparseable are configuration errors rather than silent defaults.

use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::defaults::{
    DEFAULT_CONVERSATION_MAX_MESSAGES, DEFAULT_HTTP_HOST, DEFAULT_HTTP_PATH, DEFAULT_HTTP_PORT,
    DEFAULT_MODEL,
};
use crate::constants::env_config;
use crate::errors::{AppError, AppResult};
use crate::llm::DeepSeekClientConfig;

/// How the MCP server talks to its client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TransportMode {
    /// Newline-delimited JSON-RPC over stdin/stdout
    #[default]
    Stdio,
    /// JSON-RPC over HTTP POST
    StreamableHttp,
}

impl FromStr for TransportMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "streamable-http" | "http" => Ok(Self::StreamableHttp),
            other => Err(AppError::config_invalid(format!(
                "unknown transport '{other}', expected 'stdio' or 'streamable-http'"
            ))),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::StreamableHttp => write!(f, "streamable-http"),
        }
    }
}

/// Transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Selected transport
    pub mode: TransportMode,
    /// HTTP bind host
    pub http_host: String,
    /// HTTP bind port
    pub http_port: u16,
    /// MCP endpoint path, always starting with `/`
    pub http_path: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_owned(),
            http_port: DEFAULT_HTTP_PORT,
            http_path: DEFAULT_HTTP_PATH.to_owned(),
        }
    }
}

/// Conversation store settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// History cap per conversation
    pub max_messages: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_CONVERSATION_MAX_MESSAGES,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Upstream client settings
    pub deepseek: DeepSeekClientConfig,
    /// Model used when a tool call omits `model`
    pub default_model: String,
    /// Conversation store settings
    pub conversation: ConversationConfig,
    /// Transport settings
    pub transport: TransportConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment, seeding it from `.env`
    ///
    /// # Errors
    ///
    /// Returns an error when `DEEPSEEK_API_KEY` is missing or any variable
    /// holds an unparseable value.
    pub fn from_env() -> AppResult<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) => debug!("No .env file loaded: {e}"),
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_key = var(env_config::DEEPSEEK_API_KEY)
            .ok_or_else(|| AppError::config_missing(env_config::DEEPSEEK_API_KEY))?;

        let mut deepseek = DeepSeekClientConfig::new(api_key);
        if let Some(base_url) = var(env_config::DEEPSEEK_BASE_URL) {
            deepseek = deepseek.with_base_url(base_url);
        }
        if let Some(raw) = var(env_config::DEEPSEEK_REQUEST_TIMEOUT_MS) {
            deepseek = deepseek.with_timeout_ms(parse_positive(
                env_config::DEEPSEEK_REQUEST_TIMEOUT_MS,
                &raw,
            )?);
        }
        if let Some(raw) = var(env_config::DEEPSEEK_ENABLE_REASONER_FALLBACK) {
            deepseek = deepseek.with_reasoner_fallback(parse_bool(
                env_config::DEEPSEEK_ENABLE_REASONER_FALLBACK,
                &raw,
            )?);
        }
        if let Some(model) = var(env_config::DEEPSEEK_FALLBACK_MODEL) {
            deepseek = deepseek.with_fallback_model(model);
        }
        if let Some(user_agent) = var(env_config::DEEPSEEK_USER_AGENT) {
            deepseek = deepseek.with_user_agent(user_agent);
        }

        let default_model =
            var(env_config::DEEPSEEK_DEFAULT_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_owned());

        let conversation = match var(env_config::CONVERSATION_MAX_MESSAGES) {
            Some(raw) => ConversationConfig {
                max_messages: parse_positive(env_config::CONVERSATION_MAX_MESSAGES, &raw)?,
            },
            None => ConversationConfig::default(),
        };

        let mut transport = TransportConfig::default();
        if let Some(raw) = var(env_config::MCP_TRANSPORT) {
            transport.mode = raw.parse()?;
        }
        if let Some(host) = var(env_config::MCP_HTTP_HOST) {
            transport.http_host = host;
        }
        if let Some(raw) = var(env_config::MCP_HTTP_PORT) {
            transport.http_port = parse_positive(env_config::MCP_HTTP_PORT, &raw)?;
        }
        if let Some(path) = var(env_config::MCP_HTTP_PATH) {
            transport.http_path = normalize_http_path(&path);
        }

        Ok(Self {
            deepseek,
            default_model,
            conversation,
            transport,
        })
    }

    /// Configuration summary for logging, without secrets
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "DeepSeek MCP Server Configuration:\n\
             - Base URL: {}\n\
             - Timeout: {}ms\n\
             - Default Model: {}\n\
             - Reasoner Fallback: {} ({})\n\
             - Conversation Cap: {}\n\
             - Transport: {}",
            self.deepseek.base_url,
            self.deepseek.timeout_ms,
            self.default_model,
            if self.deepseek.enable_reasoner_fallback {
                "Enabled"
            } else {
                "Disabled"
            },
            self.deepseek.fallback_model,
            self.conversation.max_messages,
            match self.transport.mode {
                TransportMode::Stdio => "stdio".to_owned(),
                TransportMode::StreamableHttp => format!(
                    "streamable-http on {}:{}{}",
                    self.transport.http_host, self.transport.http_port, self.transport.http_path
                ),
            },
        )
    }
}

/// Parse a boolean switch (`1/true/yes/on`, `0/false/no/off`)
///
/// # Errors
///
/// Returns `ConfigInvalid` for any other value.
pub fn parse_bool(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::config_invalid(format!(
            "{key} must be a boolean (1/true/yes/on or 0/false/no/off), got '{other}'"
        ))),
    }
}

/// Parse a strictly positive integer
///
/// # Errors
///
/// Returns `ConfigInvalid` for non-numeric or zero values.
pub fn parse_positive<T>(key: &str, raw: &str) -> AppResult<T>
where
    T: FromStr + PartialEq + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value != T::default() => Ok(value),
        _ => Err(AppError::config_invalid(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}

/// Ensure an HTTP path starts with exactly one `/` and has no trailing slash
#[must_use]
pub fn normalize_http_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    format!("/{trimmed}")
}
