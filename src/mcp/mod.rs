// ABOUTME: Model Context Protocol (MCP) implementation exposing the DeepSeek API to MCP clients
// ABOUTME: Request routing, tool dispatch, resources, prompts and the stdio transport
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// JSON-RPC request validation and method routing
pub mod mcp_request_processor;
/// Initialize, discovery, resource and prompt handlers
pub mod protocol;
/// Shared handler dependencies
pub mod resources;
/// MCP message records and the tool catalog
pub mod schema;
/// `tools/call` dispatch
pub mod tool_handlers;
/// stdio loop and transport selection
pub mod transport_manager;

pub use mcp_request_processor::McpRequestProcessor;
pub use resources::ServerResources;
pub use transport_manager::{StdioTransport, TransportManager};
