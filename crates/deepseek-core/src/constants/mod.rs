// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Upstream defaults, environment variable names and MCP protocol values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Constants are grouped by domain rather than kept in a single large file.

/// Default values for the upstream client, conversation store and transports
pub mod defaults;
/// Environment variable names read at startup
pub mod env_config;
/// JSON-RPC error codes
pub mod errors;
/// MCP and JSON-RPC protocol values
pub mod protocol;

pub use errors::*;
