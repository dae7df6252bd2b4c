// ABOUTME: Shared test helpers for integration tests
// ABOUTME: Exports axum request helpers and a scripted in-memory DeepSeek API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)]

pub mod axum_test;
pub mod mock_api;
