// ABOUTME: MCP protocol constants for version and server identification
// ABOUTME: Compile-time values plus the env-overridable protocol version
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Protocol constants for MCP and JSON-RPC

use std::env;

use super::env_config::MCP_PROTOCOL_VERSION;

/// JSON-RPC version (standard, not configurable)
pub const JSONRPC_VERSION: &str = "2.0";

/// Server name reported in `initialize`
pub const SERVER_NAME: &str = "deepseek-mcp-server";

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP protocol version used when no override is set
pub const DEFAULT_MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// MCP protocol version, overridable through `MCP_PROTOCOL_VERSION`
#[must_use]
pub fn mcp_protocol_version() -> String {
    env::var(MCP_PROTOCOL_VERSION).unwrap_or_else(|_| DEFAULT_MCP_PROTOCOL_VERSION.to_owned())
}

/// Default upstream user agent
#[must_use]
pub fn default_user_agent() -> String {
    format!("{SERVER_NAME}/{SERVER_VERSION}")
}
