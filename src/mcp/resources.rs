// ABOUTME: Shared resource container injected into every MCP request handler
// ABOUTME: Holds the DeepSeek API client, the conversation store and the default model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server Resources Module
//!
//! Centralized resource container for dependency injection. Built once at
//! startup and shared behind an `Arc` by both transports.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::conversation::ConversationStore;
use crate::errors::AppResult;
use crate::llm::{DeepSeekApi, DeepSeekClient};

/// Centralized resource container for dependency injection
#[derive(Clone)]
pub struct ServerResources {
    /// Upstream API client
    pub api: Arc<dyn DeepSeekApi>,
    /// Process-lifetime chat history
    pub conversations: Arc<ConversationStore>,
    /// Model used when a tool call omits `model`
    pub default_model: Arc<str>,
}

impl ServerResources {
    /// Assemble resources from already-built parts
    #[must_use]
    pub fn new(
        api: Arc<dyn DeepSeekApi>,
        conversations: Arc<ConversationStore>,
        default_model: &str,
    ) -> Self {
        Self {
            api,
            conversations,
            default_model: Arc::from(default_model),
        }
    }

    /// Build the DeepSeek client and conversation store described by `config`
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the client cannot be constructed
    pub fn from_config(config: &ServerConfig) -> AppResult<Self> {
        let client = DeepSeekClient::new(config.deepseek.clone())?;
        Ok(Self::new(
            Arc::new(client),
            Arc::new(ConversationStore::new(config.conversation.max_messages)),
            &config.default_model,
        ))
    }
}
