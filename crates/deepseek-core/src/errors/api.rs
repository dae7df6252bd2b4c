// ABOUTME: Typed upstream API error for DeepSeek HTTP calls
// ABOUTME: Carries status, message, raw payload and cause plus the shared retry policy table
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;

/// HTTP statuses that are considered transient for upstream calls
pub const RETRIABLE_STATUS_CODES: [u16; 7] = [408, 409, 429, 500, 502, 503, 504];

/// Boxed underlying failure attached to transport and timeout errors
pub type BoxedCause = Box<dyn StdError + Send + Sync + 'static>;

/// Category of an upstream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Upstream answered with a non-2xx status
    Upstream,
    /// No response received (connection refused, reset, DNS, ...)
    Transport,
    /// The configured per-request deadline elapsed
    Timeout,
    /// A 2xx response whose body could not be decoded
    InvalidResponse,
}

/// Error raised by the DeepSeek API client
///
/// Upstream errors always carry `status`; transport and timeout errors never do
/// and carry the underlying failure in `cause` instead.
#[derive(Debug, thiserror::Error)]
pub struct ApiError {
    /// Failure category
    pub kind: ApiErrorKind,
    /// Human-readable message, extracted from the upstream body when possible
    pub message: String,
    /// HTTP status for upstream errors
    pub status: Option<u16>,
    /// Raw upstream body (JSON, or a JSON string when the body was not JSON)
    pub payload: Option<Value>,
    /// Underlying failure
    #[source]
    pub cause: Option<BoxedCause>,
}

impl ApiError {
    /// Non-2xx upstream response
    #[must_use]
    pub fn upstream(status: u16, message: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            kind: ApiErrorKind::Upstream,
            message: message.into(),
            status: Some(status),
            payload,
            cause: None,
        }
    }

    /// Upstream response built from a raw body, extracting the message the way
    /// DeepSeek reports it (`error.message`, then `message`)
    #[must_use]
    pub fn from_response_body(status: u16, body: &str) -> Self {
        let payload = serde_json::from_str::<Value>(body).ok();
        let message = payload
            .as_ref()
            .and_then(extract_error_message)
            .unwrap_or_else(|| format!("request failed with status {status}"));
        let payload = payload.or_else(|| {
            let trimmed = body.trim();
            (!trimmed.is_empty()).then(|| Value::String(trimmed.to_owned()))
        });
        Self::upstream(status, message, payload)
    }

    /// Connection-level failure, no response received
    #[must_use]
    pub fn transport(
        message: impl Into<String>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: ApiErrorKind::Transport,
            message: message.into(),
            status: None,
            payload: None,
            cause: Some(Box::new(cause)),
        }
    }

    /// The in-flight request was aborted at the configured deadline
    #[must_use]
    pub fn timeout(timeout_ms: u64, cause: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            kind: ApiErrorKind::Timeout,
            message: format!("request timed out after {timeout_ms}ms"),
            status: None,
            payload: None,
            cause: Some(Box::new(cause)),
        }
    }

    /// 2xx response with an undecodable body
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self {
            kind: ApiErrorKind::InvalidResponse,
            message: message.into(),
            status: None,
            payload: None,
            cause: None,
        }
    }

    /// Attach an underlying failure
    #[must_use]
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Whether this failure is worth retrying
    ///
    /// This is the single policy table used both for reasoner fallback and for
    /// the guidance text shown to MCP callers. Anything that is not an upstream
    /// status response is retriable; upstream responses are retriable only for
    /// the statuses in [`RETRIABLE_STATUS_CODES`].
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match (self.kind, self.status) {
            (ApiErrorKind::Upstream, Some(status)) => is_retriable_status(status),
            (ApiErrorKind::Upstream, None) => false,
            _ => true,
        }
    }

    /// Whether the deadline elapsed
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind == ApiErrorKind::Timeout
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "DeepSeek API error ({status}): {}", self.message),
            None => write!(f, "DeepSeek API error: {}", self.message),
        }
    }
}

/// Check whether an HTTP status is in the retriable set
#[must_use]
pub fn is_retriable_status(status: u16) -> bool {
    RETRIABLE_STATUS_CODES.contains(&status)
}

/// Pull a message out of an upstream error body
///
/// Tries `error.message` first, then a top-level `message`.
#[must_use]
pub fn extract_error_message(payload: &Value) -> Option<String> {
    payload
        .pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("message").and_then(Value::as_str))
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io;

    #[test]
    fn test_message_prefers_nested_error() {
        let err = ApiError::from_response_body(
            402,
            r#"{"error":{"message":"Insufficient Balance"},"message":"outer"}"#,
        );
        assert_eq!(err.message, "Insufficient Balance");
        assert_eq!(err.status, Some(402));
        assert!(err.payload.is_some());
    }

    #[test]
    fn test_message_falls_back_to_top_level_then_generic() {
        let top = ApiError::from_response_body(500, r#"{"message":"boom"}"#);
        assert_eq!(top.message, "boom");

        let generic = ApiError::from_response_body(502, "<html>bad gateway</html>");
        assert_eq!(generic.message, "request failed with status 502");
        assert_eq!(
            generic.payload,
            Some(Value::String("<html>bad gateway</html>".to_owned()))
        );

        let empty = ApiError::from_response_body(503, "");
        assert!(empty.payload.is_none());
    }

    #[test]
    fn test_retry_policy_table() {
        for status in RETRIABLE_STATUS_CODES {
            assert!(ApiError::upstream(status, "x", None).is_retriable());
        }
        for status in [400, 401, 402, 403, 404, 422] {
            assert!(!ApiError::upstream(status, "x", None).is_retriable());
        }
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        assert!(ApiError::transport("connection refused", refused).is_retriable());
        let timed_out = io::Error::new(io::ErrorKind::TimedOut, "deadline");
        let timeout = ApiError::timeout(50, timed_out);
        assert!(timeout.is_retriable());
        assert!(timeout.is_timeout());
        assert!(timeout.status.is_none());
        assert!(timeout.cause.is_some());
    }

    #[test]
    fn test_extract_error_message_ignores_non_strings() {
        assert_eq!(extract_error_message(&json!({"error": {"message": 3}})), None);
        assert_eq!(extract_error_message(&json!([1, 2])), None);
    }
}
