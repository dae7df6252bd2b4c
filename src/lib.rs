// ABOUTME: Main library entry point for the DeepSeek MCP server
// ABOUTME: Exposes the DeepSeek API client, conversation store and MCP transports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # DeepSeek MCP Server
//!
//! A Model Context Protocol (MCP) server that turns DeepSeek API endpoints
//! into MCP tools. Streamed completions are aggregated into ordinary
//! responses, transient reasoner failures fall back to a substitute model, and
//! text completions that require the beta endpoint are retried there once.
//!
//! ## Architecture
//!
//! - **llm**: request/response records, SSE parsing, stream aggregation and the HTTP client
//! - **conversation**: process-lifetime chat history keyed by conversation id
//! - **mcp**: JSON-RPC routing, tool dispatch, resources, prompts and the stdio loop
//! - **routes**: the streamable HTTP transport
//! - **config** / **logging**: environment-driven settings and tracing setup
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use deepseek_mcp_server::config::ServerConfig;
//! use deepseek_mcp_server::errors::AppResult;
//! use deepseek_mcp_server::mcp::{ServerResources, TransportManager};
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let resources = Arc::new(ServerResources::from_config(&config)?);
//!     TransportManager::new(resources).run(&config.transport).await
//! }
//! ```

/// Environment configuration
pub mod config;

/// Conversation history store
pub mod conversation;

/// JSON-RPC 2.0 message types
pub mod jsonrpc;

/// DeepSeek API client and stream handling
pub mod llm;

/// Tracing subscriber setup
pub mod logging;

/// MCP protocol implementation
pub mod mcp;

/// HTTP transport routes
pub mod routes;

/// Unified error handling (re-exported from `deepseek-core`)
pub use deepseek_core::errors;

/// Application constants (re-exported from `deepseek-core`)
pub use deepseek_core::constants;
