// ABOUTME: HTTP-level tests for the DeepSeek client against a wiremock upstream
// ABOUTME: Covers streaming aggregation, reasoner fallback, beta base retry, timeouts and error normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::time::Duration;

use deepseek_mcp_server::errors::ApiErrorKind;
use deepseek_mcp_server::llm::{
    ChatCompletionRequest, ChatMessage, CompletionRequest, DeepSeekApi, DeepSeekClient,
    DeepSeekClientConfig,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "sk-test";

fn client_for(server: &MockServer) -> DeepSeekClient {
    DeepSeekClient::new(DeepSeekClientConfig::new(API_KEY).with_base_url(server.uri())).unwrap()
}

fn chat_body(model: &str, text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
    })
}

fn completion_body(text: &str) -> Value {
    json!({
        "id": "cmpl-1",
        "object": "text_completion",
        "created": 1_700_000_000,
        "model": "deepseek-chat",
        "choices": [{"index": 0, "text": text, "finish_reason": "stop"}]
    })
}

fn sse(events: &[Value]) -> String {
    let mut body: String = events
        .iter()
        .map(|event| format!("data: {event}\n\n"))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

fn user_chat(model: &str) -> ChatCompletionRequest {
    ChatCompletionRequest::new(model, vec![ChatMessage::user("hi")])
}

#[tokio::test]
async fn test_non_streaming_chat_sends_bearer_and_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "deepseek-chat", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("deepseek-chat", "hello")))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .create_chat_completion(user_chat("deepseek-chat").with_streaming(false))
        .await
        .unwrap();

    assert_eq!(result.response.first_message().unwrap().text(), Some("hello"));
    assert!(result.fallback.is_none());
    assert!(result.stream_chunk_count.is_none());
    assert_eq!(result.response.usage.unwrap().total_tokens, 7);
}

#[tokio::test]
async fn test_streaming_chat_is_aggregated() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"id": "s1", "model": "deepseek-chat", "created": 5,
               "choices": [{"index": 0, "delta": {"role": "assistant", "content": "Hel"}}]}),
        json!({"id": "s1", "choices": [{"index": 0, "delta": {"content": "lo"}, "finish_reason": "stop"}]}),
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .create_chat_completion(user_chat("deepseek-chat").with_streaming(true))
        .await
        .unwrap();

    assert_eq!(result.stream_chunk_count, Some(2));
    assert_eq!(result.response.id, "s1");
    assert_eq!(result.response.object, "chat.completion");
    assert_eq!(result.response.first_message().unwrap().text(), Some("Hello"));
}

#[tokio::test]
async fn test_reasoner_falls_back_on_retriable_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "deepseek-reasoner"})))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(json!({"error": {"message": "Server overloaded"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "deepseek-chat"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("deepseek-chat", "ok")))
        .expect(1)
        .mount(&server)
        .await;

    let result = client_for(&server)
        .create_chat_completion(user_chat("deepseek-reasoner"))
        .await
        .unwrap();

    let fallback = result.fallback.unwrap();
    assert_eq!(fallback.from_model, "deepseek-reasoner");
    assert_eq!(fallback.to_model, "deepseek-chat");
    assert_eq!(fallback.reason, "Server overloaded");
    assert_eq!(result.response.model, "deepseek-chat");
}

#[tokio::test]
async fn test_reasoner_does_not_fall_back_on_client_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "bad request"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let error = client_for(&server)
        .create_chat_completion(user_chat("deepseek-reasoner"))
        .await
        .unwrap_err();

    assert_eq!(error.kind, ApiErrorKind::Upstream);
    assert_eq!(error.status, Some(400));
    assert_eq!(error.message, "bad request");
}

#[tokio::test]
async fn test_fallback_disabled_surfaces_original_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"message": "slow down"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = DeepSeekClient::new(
        DeepSeekClientConfig::new(API_KEY)
            .with_base_url(server.uri())
            .with_reasoner_fallback(false),
    )
    .unwrap();
    let error = client
        .create_chat_completion(user_chat("deepseek-reasoner"))
        .await
        .unwrap_err();
    assert_eq!(error.status, Some(429));
    assert_eq!(error.message, "slow down");
    assert!(error.is_retriable());
}

#[tokio::test]
async fn test_failed_fallback_returns_fallback_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "deepseek-reasoner"})))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "first"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"model": "deepseek-chat"})))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({"message": "second"})))
        .expect(1)
        .mount(&server)
        .await;

    let error = client_for(&server)
        .create_chat_completion(user_chat("deepseek-reasoner"))
        .await
        .unwrap_err();
    assert_eq!(error.status, Some(502));
    assert_eq!(error.message, "second");
}

#[tokio::test]
async fn test_completion_retries_once_on_beta_base() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Completions API is only available when using beta api (set base_url=\"https://api.deepseek.com/beta\")"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/beta/completions"))
        .and(body_partial_json(json!({"prompt": "fn main", "suffix": "}"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("() {")))
        .expect(1)
        .mount(&server)
        .await;

    let request = CompletionRequest::new("deepseek-chat", "fn main").with_suffix("}");
    let result = client_for(&server).create_completion(request).await.unwrap();

    assert!(result.used_beta_base);
    assert_eq!(result.response.choices[0].text, "() {");
}

#[tokio::test]
async fn test_completion_other_400_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/completions"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "prompt too long"}})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/beta/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("never")))
        .expect(0)
        .mount(&server)
        .await;

    let error = client_for(&server)
        .create_completion(CompletionRequest::new("deepseek-chat", "x"))
        .await
        .unwrap_err();
    assert_eq!(error.status, Some(400));
    assert!(!error.is_retriable());
}

#[tokio::test]
async fn test_streaming_completion_is_aggregated() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"id": "t1", "model": "deepseek-chat", "choices": [{"index": 0, "text": "let "}]}),
        json!({"id": "t1", "choices": [{"index": 0, "text": "x = 1;", "finish_reason": "stop"}]}),
    ]);
    Mock::given(method("POST"))
        .and(path("/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let result = client_for(&server)
        .create_completion(CompletionRequest::new("deepseek-chat", "").with_streaming(true))
        .await
        .unwrap();
    assert!(!result.used_beta_base);
    assert_eq!(result.stream_chunk_count, Some(2));
    assert_eq!(result.response.choices[0].text, "let x = 1;");
}

#[tokio::test]
async fn test_non_json_error_body_gets_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let error = client_for(&server).list_models().await.unwrap_err();
    assert_eq!(error.kind, ApiErrorKind::Upstream);
    assert_eq!(error.status, Some(502));
    assert_eq!(error.message, "request failed with status 502");
    assert_eq!(
        error.payload,
        Some(Value::String("<html>Bad Gateway</html>".to_owned()))
    );
}

#[tokio::test]
async fn test_invalid_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let error = client_for(&server).get_user_balance().await.unwrap_err();
    assert_eq!(error.kind, ApiErrorKind::InvalidResponse);
    assert!(error.status.is_none());
}

#[tokio::test]
async fn test_request_timeout_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"object": "list", "data": []}))
                .set_delay(Duration::from_millis(1_000)),
        )
        .mount(&server)
        .await;

    let client = DeepSeekClient::new(
        DeepSeekClientConfig::new(API_KEY)
            .with_base_url(server.uri())
            .with_timeout_ms(100),
    )
    .unwrap();
    let error = client.list_models().await.unwrap_err();
    assert!(error.is_timeout());
    assert!(error.status.is_none());
    assert!(error.is_retriable());
}

#[tokio::test]
async fn test_connection_failure_is_transport_error() {
    // Nothing listens on port 9 locally
    let client = DeepSeekClient::new(
        DeepSeekClientConfig::new(API_KEY).with_base_url("http://127.0.0.1:9"),
    )
    .unwrap();
    let error = client.list_models().await.unwrap_err();
    assert_eq!(error.kind, ApiErrorKind::Transport);
    assert!(error.status.is_none());
    assert!(error.is_retriable());
}

#[tokio::test]
async fn test_models_and_balance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                {"id": "deepseek-chat", "object": "model", "owned_by": "deepseek"},
                {"id": "deepseek-reasoner", "object": "model", "owned_by": "deepseek"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/balance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "is_available": true,
            "balance_infos": [{
                "currency": "CNY",
                "total_balance": "110.00",
                "granted_balance": "10.00",
                "topped_up_balance": "100.00"
            }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let models = client.list_models().await.unwrap();
    let ids: Vec<&str> = models.data.iter().map(|model| model.id.as_str()).collect();
    assert_eq!(ids, ["deepseek-chat", "deepseek-reasoner"]);

    let balance = client.get_user_balance().await.unwrap();
    assert!(balance.is_available);
    assert_eq!(balance.balance_infos[0].currency, "CNY");
    assert_eq!(balance.balance_infos[0].total_balance, "110.00");
}

#[test]
fn test_beta_base_is_derived_from_host() {
    let client = DeepSeekClient::new(
        DeepSeekClientConfig::new(API_KEY).with_base_url("https://api.deepseek.com/v1/"),
    )
    .unwrap();
    assert_eq!(client.base_url(), "https://api.deepseek.com/v1");
    assert_eq!(client.beta_base_url(), "https://api.deepseek.com/beta");
}
