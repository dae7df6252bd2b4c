// ABOUTME: Health check route handler for the streamable HTTP transport
// ABOUTME: Reports liveness with the server name, version and current timestamp
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check routes for service monitoring

use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use crate::constants::protocol::{SERVER_NAME, SERVER_VERSION};

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// `GET /health`
    pub fn routes() -> Router {
        Router::new().route("/health", get(health_handler))
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVER_NAME,
        "version": SERVER_VERSION,
        "timestamp": Utc::now().to_rfc3339()
    }))
}
