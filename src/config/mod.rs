// ABOUTME: Configuration module for centralized server settings
// ABOUTME: Environment-driven settings for the DeepSeek client, conversation store and transports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration module for the DeepSeek MCP server
//!
//! All settings come from environment variables (optionally seeded from a
//! `.env` file). CLI flags in the binary override the transport section.

/// Environment and server configuration
pub mod environment;

pub use environment::{ConversationConfig, ServerConfig, TransportConfig, TransportMode};
