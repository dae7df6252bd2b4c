// ABOUTME: Core types and constants for the DeepSeek MCP server
// ABOUTME: Foundation crate with error handling and configuration constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # DeepSeek Core
//!
//! Shared error taxonomy and constants for the DeepSeek MCP server. This crate
//! changes rarely, so the main crate gets incremental compilation benefits.
//!
//! ## Modules
//!
//! - **errors**: `AppError`/`ErrorCode` for the server and `ApiError` for upstream failures
//! - **constants**: Defaults, environment variable names and protocol values

/// Unified error handling with error codes and the upstream API error type
pub mod errors;

/// Application constants organized by domain
pub mod constants;
