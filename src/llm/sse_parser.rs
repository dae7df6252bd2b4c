// ABOUTME: Line-buffering SSE (Server-Sent Events) parser for DeepSeek streaming responses
// ABOUTME: Handles partial lines across TCP boundaries, multiple events per chunk and the [DONE] sentinel
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # SSE Stream Parser
//!
//! DeepSeek streams `text/event-stream` bodies made of `data: <json>` lines,
//! events separated by a blank line, terminated by `data: [DONE]`. TCP chunk
//! boundaries do not line up with event boundaries, so this parser:
//!
//! 1. emits every event contained in a chunk before the next read, in order;
//! 2. buffers a trailing partial line until the rest of it arrives.
//!
//! [`collect_json_events`] drives the buffer over a whole byte stream and
//! returns the decoded JSON payloads, which the aggregator then folds.

use std::{mem, str};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use tracing::warn;

use crate::errors::ApiError;

/// Terminal sentinel payload
const DONE_SENTINEL: &str = "[DONE]";

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped
    Data(String),
    /// The `[DONE]` termination signal
    Done,
}

/// Line-buffering SSE parser that handles partial lines across TCP chunk boundaries
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    /// Accumulated text not yet terminated by a newline
    buffer: String,
    /// Bytes of an incomplete UTF-8 sequence split across chunks
    pending_bytes: Vec<u8>,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes from a network chunk, returning every complete event
    ///
    /// A trailing partial line stays buffered for the next call. `\r\n` line
    /// endings are normalized to `\n`.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.push_utf8(bytes);

        let mut events = Vec::new();
        while let Some(newline_pos) = self.buffer.find('\n') {
            let rest = self.buffer.split_off(newline_pos + 1);
            let line = mem::replace(&mut self.buffer, rest);
            if let Some(event) = parse_line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush any remaining buffered content as a final event
    ///
    /// Called when the byte stream ends without a trailing newline.
    pub fn flush(&mut self) -> Vec<SseEvent> {
        if !self.pending_bytes.is_empty() {
            let tail = mem::take(&mut self.pending_bytes);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let remaining = mem::take(&mut self.buffer);
        parse_line(remaining.trim_end_matches(['\n', '\r']))
            .into_iter()
            .collect()
    }

    /// Append bytes, holding back an incomplete trailing UTF-8 sequence
    fn push_utf8(&mut self, bytes: &[u8]) {
        self.pending_bytes.extend_from_slice(bytes);
        let valid_up_to = match str::from_utf8(&self.pending_bytes) {
            Ok(text) => {
                self.buffer.push_str(text);
                self.pending_bytes.clear();
                return;
            }
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => {
                let lossy = String::from_utf8_lossy(&self.pending_bytes).into_owned();
                self.buffer.push_str(&lossy);
                self.pending_bytes.clear();
                return;
            }
        };
        let tail = self.pending_bytes.split_off(valid_up_to);
        self.buffer.push_str(&String::from_utf8_lossy(&self.pending_bytes));
        self.pending_bytes = tail;
    }
}

/// Parse one SSE line; blank lines, comments and non-data fields yield nothing
fn parse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data).trim();
    if data.is_empty() {
        return None;
    }
    if data == DONE_SENTINEL {
        return Some(SseEvent::Done);
    }
    Some(SseEvent::Data(data.to_owned()))
}

/// Read a whole SSE byte stream and decode every `data:` payload as JSON
///
/// Stops at `[DONE]` or at the end of the stream. Payloads that are not valid
/// JSON are logged and skipped. A read error aborts collection.
///
/// # Errors
///
/// Returns the first error produced by the byte stream.
pub async fn collect_json_events<S>(byte_stream: S) -> Result<Vec<Value>, ApiError>
where
    S: Stream<Item = Result<Bytes, ApiError>> + Send,
{
    let mut byte_stream = Box::pin(byte_stream);
    let mut parser = SseLineBuffer::new();
    let mut payloads = Vec::new();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk?;
        if push_events(parser.feed(&chunk), &mut payloads) {
            return Ok(payloads);
        }
    }
    push_events(parser.flush(), &mut payloads);
    Ok(payloads)
}

/// Decode events into `payloads`; returns true once `[DONE]` is seen
fn push_events(events: Vec<SseEvent>, payloads: &mut Vec<Value>) -> bool {
    for event in events {
        match event {
            SseEvent::Done => return true,
            SseEvent::Data(data) => match serde_json::from_str::<Value>(&data) {
                Ok(value) => payloads.push(value),
                Err(e) => warn!(error = %e, "Skipping malformed stream chunk"),
            },
        }
    }
    false
}
