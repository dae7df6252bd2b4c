// ABOUTME: HTTP client for the DeepSeek API with stream aggregation and recovery policies
// ABOUTME: Implements reasoner-to-chat fallback, beta base retry for completions and error normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # DeepSeek Client
//!
//! Translates request records into upstream HTTP calls and hides whether a
//! call was streamed. Two narrowly scoped recoveries are applied:
//!
//! - **Reasoner fallback**: a `deepseek-reasoner` chat call that fails with a
//!   retriable error is reissued once with the configured fallback model.
//! - **Beta base retry**: a text completion rejected with 400 because it needs
//!   the beta endpoint family is reissued once against `<host>/beta`.
//!
//! Every other failure surfaces immediately as an [`ApiError`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use deepseek_mcp_server::llm::{
//!     ChatCompletionRequest, ChatMessage, DeepSeekApi, DeepSeekClient, DeepSeekClientConfig,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = DeepSeekClient::new(DeepSeekClientConfig::new("sk-..."))?;
//! let request = ChatCompletionRequest::new(
//!     "deepseek-chat",
//!     vec![ChatMessage::user("What is a monad?")],
//! )
//! .with_streaming(true);
//! let result = client.create_chat_completion(request).await?;
//! println!("{:?}", result.response.first_message());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::sse_parser::collect_json_events;
use super::{
    aggregate_chat_chunks, aggregate_completion_chunks, ChatCompletionExecutionResult,
    ChatCompletionRequest, ChatCompletionResponse, CompletionExecutionResult, CompletionRequest,
    DeepSeekApi, FallbackMetadata, ModelList, TextCompletionResponse, UserBalance,
};
use crate::constants::defaults::{
    BETA_PATH, DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_FALLBACK_MODEL,
    DEFAULT_TIMEOUT_MS, REASONER_MODEL,
};
use crate::constants::protocol::default_user_agent;
use crate::errors::{ApiError, ApiErrorKind, AppError};

// ============================================================================
// Endpoints
// ============================================================================

const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const COMPLETIONS_PATH: &str = "/completions";
const MODELS_PATH: &str = "/models";
const USER_BALANCE_PATH: &str = "/user/balance";

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_EVENT_STREAM: &str = "text/event-stream";

/// Lowercased marker of the upstream rejection that requires the beta base.
///
/// This matches provider prose ("completions api is only available when using
/// beta api"), so it is a soft coupling: a wording change upstream silently
/// disables the retry.
const BETA_REQUIRED_MARKER: &str = "beta api";

// ============================================================================
// Configuration
// ============================================================================

/// Construction-time settings, fixed for the client's lifetime
#[derive(Clone)]
pub struct DeepSeekClientConfig {
    /// Bearer credential
    pub api_key: String,
    /// Upstream base URL
    pub base_url: String,
    /// Per-request deadline in milliseconds, covering the full body read
    pub timeout_ms: u64,
    /// User agent header value
    pub user_agent: String,
    /// Retry transient reasoner failures with `fallback_model`
    pub enable_reasoner_fallback: bool,
    /// Substitute model for reasoner fallback
    pub fallback_model: String,
}

impl DeepSeekClientConfig {
    /// Settings with defaults for everything but the credential
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: default_user_agent(),
            enable_reasoner_fallback: true,
            fallback_model: DEFAULT_FALLBACK_MODEL.to_owned(),
        }
    }

    /// Override the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-request deadline
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Enable or disable reasoner fallback
    #[must_use]
    pub const fn with_reasoner_fallback(mut self, enabled: bool) -> Self {
        self.enable_reasoner_fallback = enabled;
        self
    }

    /// Override the fallback model
    #[must_use]
    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    /// Override the user agent
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

// Keep the credential out of debug output
impl fmt::Debug for DeepSeekClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepSeekClientConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("user_agent", &self.user_agent)
            .field("enable_reasoner_fallback", &self.enable_reasoner_fallback)
            .field("fallback_model", &self.fallback_model)
            .finish()
    }
}

/// Strip surrounding whitespace and trailing slashes from a base URL
#[must_use]
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_owned()
}

/// Derive the beta base: same scheme and host, path replaced by `/beta`
#[must_use]
pub fn build_beta_base_url(base_url: &Url) -> String {
    let mut beta = base_url.clone();
    beta.set_path(BETA_PATH);
    beta.set_query(None);
    beta.set_fragment(None);
    normalize_base_url(beta.as_str())
}

/// Whether a completion failure asks for the beta endpoint family
#[must_use]
pub fn requires_beta_base(error: &ApiError) -> bool {
    error.kind == ApiErrorKind::Upstream
        && error.status == Some(400)
        && error.message.to_lowercase().contains(BETA_REQUIRED_MARKER)
}

// ============================================================================
// Client
// ============================================================================

/// DeepSeek API client
///
/// Holds no mutable state; clone the surrounding `Arc` to share it.
#[derive(Debug, Clone)]
pub struct DeepSeekClient {
    config: DeepSeekClientConfig,
    base_url: String,
    beta_base_url: String,
    client: Client,
}

impl DeepSeekClient {
    /// Build a client, validating the credential and base URL
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a blank API key, an unparseable or
    /// non-HTTP base URL, a zero timeout, or when the HTTP client cannot be built.
    pub fn new(config: DeepSeekClientConfig) -> Result<Self, AppError> {
        if config.api_key.trim().is_empty() {
            return Err(AppError::config_missing("DEEPSEEK_API_KEY"));
        }
        if config.timeout_ms == 0 {
            return Err(AppError::config_invalid(
                "request timeout must be greater than zero",
            ));
        }

        let base_url = normalize_base_url(&config.base_url);
        let parsed = Url::parse(&base_url).map_err(|e| {
            AppError::config_invalid(format!("invalid DeepSeek base URL '{base_url}': {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::config_invalid(format!(
                "DeepSeek base URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }
        let beta_base_url = build_beta_base_url(&parsed);

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(
                DEFAULT_CONNECT_TIMEOUT_MS.min(config.timeout_ms),
            ))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                AppError::internal(format!("failed to build HTTP client: {e}")).with_source(e)
            })?;

        info!(
            base_url = %base_url,
            timeout_ms = config.timeout_ms,
            reasoner_fallback = config.enable_reasoner_fallback,
            fallback_model = %config.fallback_model,
            "Initialized DeepSeek client"
        );

        Ok(Self {
            config,
            base_url,
            beta_base_url,
            client,
        })
    }

    /// Client settings
    #[must_use]
    pub const fn config(&self) -> &DeepSeekClientConfig {
        &self.config
    }

    /// Normalized primary base URL
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Derived beta base URL
    #[must_use]
    pub fn beta_base_url(&self) -> &str {
        &self.beta_base_url
    }

    /// Whether a failed call with `model` should be reissued with the fallback model
    #[must_use]
    pub fn should_fallback(&self, model: &str, error: &ApiError) -> bool {
        self.config.enable_reasoner_fallback
            && model == REASONER_MODEL
            && self.config.fallback_model != model
            && error.is_retriable()
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    fn map_request_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            return ApiError::timeout(self.config.timeout_ms, error);
        }
        let message = if error.is_connect() {
            format!("failed to connect to DeepSeek API: {error}")
        } else {
            format!("request to DeepSeek API failed: {error}")
        };
        ApiError::transport(message, error)
    }

    async fn send<B>(
        &self,
        method: Method,
        base_url: &str,
        path: &str,
        body: Option<&B>,
        accept: &'static str,
    ) -> Result<Response, ApiError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let started = Instant::now();
        let mut request = self
            .client
            .request(method.clone(), format!("{base_url}{path}"))
            .bearer_auth(&self.config.api_key)
            .header(ACCEPT, accept)
            .timeout(Duration::from_millis(self.config.timeout_ms));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        let status = response.status();
        debug!(
            %method,
            base_url,
            path,
            status = status.as_u16(),
            duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "DeepSeek API responded"
        );
        if status.is_success() {
            return Ok(response);
        }

        let body = read_error_body(response).await;
        let error = ApiError::from_response_body(status.as_u16(), &body);
        warn!(
            %method,
            path,
            status = status.as_u16(),
            message = %error.message,
            "DeepSeek API returned an error"
        );
        Err(error)
    }

    async fn decode_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_request_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::invalid_response(format!("DeepSeek API returned invalid JSON: {e}"))
                .with_cause(e)
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .send::<Value>(Method::GET, &self.base_url, path, None, ACCEPT_JSON)
            .await?;
        self.decode_json(response).await
    }

    async fn post_json<B, T>(&self, base_url: &str, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .send(Method::POST, base_url, path, Some(body), ACCEPT_JSON)
            .await?;
        self.decode_json(response).await
    }

    async fn post_sse<B>(
        &self,
        base_url: &str,
        path: &str,
        body: &B,
    ) -> Result<Vec<Value>, ApiError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let response = self
            .send(Method::POST, base_url, path, Some(body), ACCEPT_EVENT_STREAM)
            .await?;
        let byte_stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| self.map_request_error(e)));
        let chunks = collect_json_events(byte_stream).await?;
        debug!(path, chunks = chunks.len(), "Collected stream chunks");
        Ok(chunks)
    }

    // ------------------------------------------------------------------------
    // Single attempts
    // ------------------------------------------------------------------------

    async fn execute_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<(ChatCompletionResponse, Option<usize>), ApiError> {
        if request.is_streaming() {
            let chunks = self
                .post_sse(&self.base_url, CHAT_COMPLETIONS_PATH, request)
                .await?;
            let response = aggregate_chat_chunks(&chunks, &request.model);
            return Ok((response, Some(chunks.len())));
        }
        let response = self
            .post_json(&self.base_url, CHAT_COMPLETIONS_PATH, request)
            .await?;
        Ok((response, None))
    }

    async fn execute_completion(
        &self,
        base_url: &str,
        request: &CompletionRequest,
    ) -> Result<(TextCompletionResponse, Option<usize>), ApiError> {
        if request.is_streaming() {
            let chunks = self.post_sse(base_url, COMPLETIONS_PATH, request).await?;
            let response = aggregate_completion_chunks(&chunks, &request.model);
            return Ok((response, Some(chunks.len())));
        }
        let response = self.post_json(base_url, COMPLETIONS_PATH, request).await?;
        Ok((response, None))
    }
}

#[async_trait]
impl DeepSeekApi for DeepSeekClient {
    #[instrument(skip(self, request), fields(model = %request.model, stream = request.is_streaming()))]
    async fn create_chat_completion(
        &self,
        request: ChatCompletionRequest,
    ) -> Result<ChatCompletionExecutionResult, ApiError> {
        match self.execute_chat(&request).await {
            Ok((response, stream_chunk_count)) => Ok(ChatCompletionExecutionResult {
                response,
                fallback: None,
                stream_chunk_count,
            }),
            Err(error) if self.should_fallback(&request.model, &error) => {
                let from_model = request.model.clone();
                let to_model = self.config.fallback_model.clone();
                warn!(
                    from_model = %from_model,
                    to_model = %to_model,
                    status = ?error.status,
                    reason = %error.message,
                    "Reasoner call failed, retrying with fallback model"
                );

                let mut fallback_request = request;
                fallback_request.model.clone_from(&to_model);
                let (response, stream_chunk_count) = self.execute_chat(&fallback_request).await?;
                Ok(ChatCompletionExecutionResult {
                    response,
                    fallback: Some(FallbackMetadata {
                        from_model,
                        to_model,
                        reason: error.message,
                    }),
                    stream_chunk_count,
                })
            }
            Err(error) => Err(error),
        }
    }

    #[instrument(skip(self, request), fields(model = %request.model, stream = request.is_streaming()))]
    async fn create_completion(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionExecutionResult, ApiError> {
        match self.execute_completion(&self.base_url, &request).await {
            Ok((response, stream_chunk_count)) => Ok(CompletionExecutionResult {
                response,
                used_beta_base: false,
                stream_chunk_count,
            }),
            Err(error) if requires_beta_base(&error) && self.beta_base_url != self.base_url => {
                warn!(
                    beta_base_url = %self.beta_base_url,
                    reason = %error.message,
                    "Completion requires the beta endpoint, retrying once"
                );
                let (response, stream_chunk_count) = self
                    .execute_completion(&self.beta_base_url, &request)
                    .await?;
                Ok(CompletionExecutionResult {
                    response,
                    used_beta_base: true,
                    stream_chunk_count,
                })
            }
            Err(error) => Err(error),
        }
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<ModelList, ApiError> {
        self.get_json(MODELS_PATH).await
    }

    #[instrument(skip(self))]
    async fn get_user_balance(&self) -> Result<UserBalance, ApiError> {
        self.get_json(USER_BALANCE_PATH).await
    }
}

/// Body of a failed response; empty when the body itself cannot be read
async fn read_error_body(response: Response) -> String {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!(status, error = %e, "Failed to read DeepSeek API error body");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use axum::http;
    use bytes::Bytes;
    use futures_util::stream;
    use reqwest::Body;

    use super::*;

    #[test]
    fn test_normalize_base_url_trims_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://api.deepseek.com/"),
            "https://api.deepseek.com"
        );
        assert_eq!(
            normalize_base_url(" https://api.deepseek.com// "),
            "https://api.deepseek.com"
        );
    }

    #[test]
    fn test_beta_base_replaces_path() {
        let plain = Url::parse("https://api.deepseek.com").unwrap();
        assert_eq!(build_beta_base_url(&plain), "https://api.deepseek.com/beta");

        let versioned = Url::parse("http://localhost:8080/v1?x=1").unwrap();
        assert_eq!(build_beta_base_url(&versioned), "http://localhost:8080/beta");
    }

    #[test]
    fn test_requires_beta_base_matches_only_400_with_marker() {
        let beta = ApiError::upstream(
            400,
            "Completions API is only available when using beta api (set base_url=\"https://api.deepseek.com/beta\")",
            None,
        );
        assert!(requires_beta_base(&beta));
        assert!(!requires_beta_base(&ApiError::upstream(500, "beta api", None)));
        assert!(!requires_beta_base(&ApiError::upstream(400, "bad prompt", None)));
    }

    #[test]
    fn test_new_rejects_bad_configuration() {
        assert!(DeepSeekClient::new(DeepSeekClientConfig::new("  ")).is_err());
        assert!(
            DeepSeekClient::new(DeepSeekClientConfig::new("k").with_base_url("not a url")).is_err()
        );
        assert!(
            DeepSeekClient::new(DeepSeekClientConfig::new("k").with_base_url("ftp://host")).is_err()
        );
        assert!(DeepSeekClient::new(DeepSeekClientConfig::new("k").with_timeout_ms(0)).is_err());
    }

    #[test]
    fn test_fallback_eligibility() {
        let client = DeepSeekClient::new(DeepSeekClientConfig::new("k")).unwrap();
        let busy = ApiError::upstream(503, "busy", None);
        let bad = ApiError::upstream(400, "bad", None);
        assert!(client.should_fallback("deepseek-reasoner", &busy));
        assert!(!client.should_fallback("deepseek-reasoner", &bad));
        assert!(!client.should_fallback("deepseek-chat", &busy));

        let same = DeepSeekClient::new(
            DeepSeekClientConfig::new("k").with_fallback_model("deepseek-reasoner"),
        )
        .unwrap();
        assert!(!same.should_fallback("deepseek-reasoner", &busy));

        let disabled =
            DeepSeekClient::new(DeepSeekClientConfig::new("k").with_reasoner_fallback(false))
                .unwrap();
        assert!(!disabled.should_fallback("deepseek-reasoner", &busy));
    }

    #[tokio::test]
    async fn test_unreadable_error_body_falls_back_to_status_message() {
        let chunks = stream::iter(vec![Err::<Bytes, io::Error>(io::Error::other(
            "connection reset",
        ))]);
        let response = http::Response::builder()
            .status(502)
            .body(Body::wrap_stream(chunks))
            .unwrap();

        let body = read_error_body(Response::from(response)).await;
        assert!(body.is_empty());

        let error = ApiError::from_response_body(502, &body);
        assert_eq!(error.status, Some(502));
        assert_eq!(error.message, "request failed with status 502");
        assert!(error.payload.is_none());
    }
}
