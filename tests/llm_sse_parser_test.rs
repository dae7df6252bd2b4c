// ABOUTME: Integration tests for the SSE line buffer and JSON event collection
// ABOUTME: Validates multi-event chunks, partial lines, split UTF-8 and stream termination
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::io;

use bytes::Bytes;
use deepseek_mcp_server::errors::{ApiError, ApiErrorKind};
use deepseek_mcp_server::llm::sse_parser::collect_json_events;
use deepseek_mcp_server::llm::{SseEvent, SseLineBuffer};
use futures_util::stream;
use serde_json::{json, Value};

/// Collect JSON payloads from raw byte chunks
async fn collect(chunks: Vec<&'static [u8]>) -> Vec<Value> {
    let byte_stream = stream::iter(
        chunks
            .into_iter()
            .map(|chunk| Ok::<Bytes, ApiError>(Bytes::from_static(chunk))),
    );
    collect_json_events(byte_stream).await.unwrap()
}

#[test]
fn test_multiple_events_in_one_chunk() {
    let mut buffer = SseLineBuffer::new();
    let events = buffer.feed(b"data: {\"a\":1}\n\ndata: {\"a\":2}\n\n");
    assert_eq!(
        events,
        vec![
            SseEvent::Data("{\"a\":1}".to_owned()),
            SseEvent::Data("{\"a\":2}".to_owned()),
        ]
    );
}

#[test]
fn test_partial_line_is_buffered_until_completed() {
    let mut buffer = SseLineBuffer::new();
    assert!(buffer.feed(b"data: {\"content\":").is_empty());
    let events = buffer.feed(b"\"hel\"}\n\n");
    assert_eq!(events, vec![SseEvent::Data("{\"content\":\"hel\"}".to_owned())]);
}

#[test]
fn test_done_sentinel_and_crlf() {
    let mut buffer = SseLineBuffer::new();
    let events = buffer.feed(b"data: {}\r\n\r\ndata: [DONE]\r\n\r\n");
    assert_eq!(events, vec![SseEvent::Data("{}".to_owned()), SseEvent::Done]);
}

#[test]
fn test_comments_and_other_fields_are_ignored() {
    let mut buffer = SseLineBuffer::new();
    let events = buffer.feed(b": keep-alive\nevent: message\nid: 7\ndata:{\"x\":true}\n\n");
    assert_eq!(events, vec![SseEvent::Data("{\"x\":true}".to_owned())]);
}

#[test]
fn test_split_multibyte_character() {
    let text = "data: {\"t\":\"héllo\"}\n";
    let bytes = text.as_bytes();
    // Split inside the two-byte 'é'
    let split = text.find('é').unwrap() + 1;

    let mut buffer = SseLineBuffer::new();
    assert!(buffer.feed(&bytes[..split]).is_empty());
    let events = buffer.feed(&bytes[split..]);
    assert_eq!(events, vec![SseEvent::Data("{\"t\":\"héllo\"}".to_owned())]);
}

#[test]
fn test_flush_emits_unterminated_last_line() {
    let mut buffer = SseLineBuffer::new();
    assert!(buffer.feed(b"data: {\"last\":1}").is_empty());
    assert_eq!(buffer.flush(), vec![SseEvent::Data("{\"last\":1}".to_owned())]);
    assert!(buffer.flush().is_empty());
}

#[tokio::test]
async fn test_collect_stops_at_done() {
    let payloads = collect(vec![
        b"data: {\"n\":1}\n\n",
        b"data: [DONE]\n\n",
        b"data: {\"n\":2}\n\n",
    ])
    .await;
    assert_eq!(payloads, vec![json!({"n": 1})]);
}

#[tokio::test]
async fn test_collect_skips_malformed_payloads() {
    let payloads = collect(vec![
        b"data: {\"n\":1}\n\ndata: not-json\n\n",
        b"data: {\"n\":2}",
    ])
    .await;
    assert_eq!(payloads, vec![json!({"n": 1}), json!({"n": 2})]);
}

#[tokio::test]
async fn test_collect_without_done_reads_to_end() {
    let payloads = collect(vec![b"data: {\"n\":1}\n", b"\ndata: {\"n\"", b":2}\n\n"]).await;
    assert_eq!(payloads, vec![json!({"n": 1}), json!({"n": 2})]);
}

#[tokio::test]
async fn test_collect_propagates_read_errors() {
    let byte_stream = stream::iter(vec![
        Ok(Bytes::from_static(b"data: {\"n\":1}\n\n")),
        Err(ApiError::transport(
            "connection reset",
            io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        )),
    ]);
    let error = collect_json_events(byte_stream).await.unwrap_err();
    assert_eq!(error.kind, ApiErrorKind::Transport);
    assert!(error.status.is_none());
}
