// ABOUTME: Tests for the streamable HTTP transport routes without binding a socket
// ABOUTME: Validates JSON responses, 202 for notifications, 400 for bad bodies and the health check
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod helpers;

use std::sync::Arc;

use axum::Router;
use deepseek_mcp_server::config::TransportConfig;
use deepseek_mcp_server::routes;
use helpers::axum_test::AxumTestRequest;
use helpers::mock_api::{completion_result, processor_with, MockDeepSeekApi};
use serde_json::{json, Value};

fn app_with_path(api: Arc<MockDeepSeekApi>, path: &str) -> Router {
    let config = TransportConfig {
        http_path: path.to_owned(),
        ..TransportConfig::default()
    };
    routes::router(&config, processor_with(api, 10))
}

fn app() -> Router {
    app_with_path(MockDeepSeekApi::new(), "/mcp")
}

#[tokio::test]
async fn test_request_gets_json_response() {
    let response = AxumTestRequest::post("/mcp")
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}))
        .send(app())
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_notification_is_accepted_without_body() {
    let response = AxumTestRequest::post("/mcp")
        .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .send(app())
        .await;
    assert_eq!(response.status(), 202);
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let response = AxumTestRequest::post("/mcp")
        .raw_body("{\"jsonrpc\": ")
        .send(app())
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn test_batch_array_is_rejected() {
    let response = AxumTestRequest::post("/mcp")
        .json(&json!([{"jsonrpc": "2.0", "id": 1, "method": "ping"}]))
        .send(app())
        .await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], -32600);
}

#[tokio::test]
async fn test_protocol_errors_still_return_200() {
    let response = AxumTestRequest::post("/mcp")
        .json(&json!({"jsonrpc": "2.0", "id": "x", "method": "does/not/exist"}))
        .send(app())
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["id"], "x");
    assert_eq!(body["error"]["code"], -32601);
}

#[tokio::test]
async fn test_tool_call_over_custom_path() {
    let api = MockDeepSeekApi::new();
    api.push_completion(Ok(completion_result("done", false)));
    let app = app_with_path(api, "/api/mcp");

    let response = AxumTestRequest::post("/api/mcp")
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "tools/call",
            "params": {"name": "completion", "arguments": {"prompt": "say"}}
        }))
        .send(app)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["result"]["isError"], false);
    assert_eq!(
        body["result"]["structuredContent"]["response"]["choices"][0]["text"],
        "done"
    );
}

#[tokio::test]
async fn test_get_on_mcp_path_is_not_allowed() {
    let response = AxumTestRequest::get("/mcp").send(app()).await;
    assert_eq!(response.status(), 405);
}

#[tokio::test]
async fn test_health_check() {
    let response = AxumTestRequest::get("/health").send(app()).await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "deepseek-mcp-server");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}
