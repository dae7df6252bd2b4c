// ABOUTME: JSON-RPC 2.0 error codes used by the MCP request processor
// ABOUTME: Standard error codes defined by JSON-RPC 2.0
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Invalid JSON was received
pub const ERROR_PARSE: i32 = -32700;
/// The JSON sent is not a valid request object
pub const ERROR_INVALID_REQUEST: i32 = -32600;
/// The method does not exist
pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method parameters
pub const ERROR_INVALID_PARAMS: i32 = -32602;
/// Internal JSON-RPC error
pub const ERROR_INTERNAL_ERROR: i32 = -32603;
