// ABOUTME: Folds streamed DeepSeek chunks into one normalized completion response
// ABOUTME: Last-wins metadata, per-choice text concatenation and index-keyed tool call merging
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Stream Aggregation
//!
//! Streamed responses arrive as a sequence of raw JSON chunks. These functions
//! fold them into the response record a non-streamed call would have
//! returned, so callers never see whether streaming happened.
//!
//! Rules, applied in arrival order:
//! - `id`, `model`, `created`, `usage` and `finish_reason`: last present value wins
//! - `content` and `reasoning_content` (chat) or `text` (completion): concatenated
//!   per choice with no separator
//! - tool calls: merged by their `index`; the first fragment seeds the call and
//!   later fragments append to `function.name` and `function.arguments`
//! - any other top-level or choice-level key: carried into `extra`, last value
//!   wins, and a `null` never replaces a value already seen
//!
//! A chat message keeps `content` absent when the stream only produced tool
//! calls, matching the non-streamed shape of a tool-call reply.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use super::{
    ChatChoice, ChatCompletionResponse, ChatMessage, Extra, FunctionCall, MessageContent,
    MessageRole, TextChoice, TextCompletionResponse, ToolCall, Usage,
};

/// Object type of an aggregated chat completion
const CHAT_COMPLETION_OBJECT: &str = "chat.completion";

/// Object type of an aggregated text completion
const TEXT_COMPLETION_OBJECT: &str = "text_completion";

/// Top-level keys the aggregator owns; everything else is passed through
const RESPONSE_FIELDS: [&str; 6] = ["id", "object", "created", "model", "choices", "usage"];

/// Choice-level keys the aggregator owns; everything else is passed through
const CHOICE_FIELDS: [&str; 5] = ["index", "delta", "message", "finish_reason", "text"];

// ============================================================================
// Shared Metadata
// ============================================================================

/// Last-wins top-level metadata of a chunk sequence
#[derive(Debug, Default)]
struct StreamHeader {
    id: Option<String>,
    model: Option<String>,
    created: Option<i64>,
    usage: Option<Usage>,
    extra: Extra,
}

impl StreamHeader {
    fn observe(&mut self, chunk: &Value) {
        if let Some(id) = non_empty_str(chunk, "id") {
            self.id = Some(id.to_owned());
        }
        if let Some(model) = non_empty_str(chunk, "model") {
            self.model = Some(model.to_owned());
        }
        if let Some(created) = chunk.get("created").and_then(Value::as_i64) {
            self.created = Some(created);
        }
        if let Some(usage) = chunk.get("usage").filter(|usage| usage.is_object()) {
            match serde_json::from_value::<Usage>(usage.clone()) {
                Ok(usage) => self.usage = Some(usage),
                Err(e) => warn!(error = %e, "Ignoring malformed usage in stream chunk"),
            }
        }
        carry_extra(&mut self.extra, chunk, &RESPONSE_FIELDS);
    }

    fn resolve_id(&mut self, prefix: &str) -> String {
        self.id
            .take()
            .unwrap_or_else(|| format!("{prefix}-{}", Utc::now().timestamp_millis()))
    }

    fn resolve_model(&mut self, requested_model: &str) -> String {
        self.model
            .take()
            .unwrap_or_else(|| requested_model.to_owned())
    }

    fn resolve_created(&self) -> i64 {
        self.created.unwrap_or_else(|| Utc::now().timestamp())
    }
}

/// Copy every key of `object` not in `owned` into `extra`
fn carry_extra(extra: &mut Extra, object: &Value, owned: &[&str]) {
    let Some(fields) = object.as_object() else {
        return;
    };
    for (key, value) in fields {
        if owned.contains(&key.as_str()) || (value.is_null() && extra.contains_key(key)) {
            continue;
        }
        extra.insert(key.clone(), value.clone());
    }
}

fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

fn choices_of(chunk: &Value) -> impl Iterator<Item = &Value> {
    chunk
        .get("choices")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn choice_index(choice: &Value) -> u32 {
    choice
        .get("index")
        .and_then(Value::as_u64)
        .and_then(|index| u32::try_from(index).ok())
        .unwrap_or(0)
}

fn finish_reason_of(choice: &Value) -> Option<&str> {
    choice.get("finish_reason").and_then(Value::as_str)
}

// ============================================================================
// Chat Completions
// ============================================================================

/// Per-choice accumulator for chat chunks
#[derive(Debug, Default)]
struct ChatChoiceState {
    content: Option<String>,
    reasoning_content: String,
    tool_calls: BTreeMap<u64, ToolCall>,
    finish_reason: Option<String>,
    extra: Extra,
}

impl ChatChoiceState {
    fn observe(&mut self, choice: &Value) {
        if let Some(reason) = finish_reason_of(choice) {
            self.finish_reason = Some(reason.to_owned());
        }
        carry_extra(&mut self.extra, choice, &CHOICE_FIELDS);

        // Streaming chunks carry a `delta`; some proxies send full `message` objects
        let Some(body) = choice
            .get("delta")
            .filter(|delta| delta.is_object())
            .or_else(|| choice.get("message"))
        else {
            return;
        };

        if let Some(text) = body.get("content").and_then(Value::as_str) {
            self.content.get_or_insert_with(String::new).push_str(text);
        }
        if let Some(text) = body.get("reasoning_content").and_then(Value::as_str) {
            self.reasoning_content.push_str(text);
        }
        if let Some(calls) = body.get("tool_calls").and_then(Value::as_array) {
            for (position, call) in calls.iter().enumerate() {
                self.merge_tool_call(position as u64, call);
            }
        }
    }

    fn merge_tool_call(&mut self, position: u64, fragment: &Value) {
        let index = fragment
            .get("index")
            .and_then(Value::as_u64)
            .unwrap_or(position);
        let id = non_empty_str(fragment, "id");
        let function = fragment.get("function");
        let name = function
            .and_then(|function| function.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        let arguments = function
            .and_then(|function| function.get("arguments"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        match self.tool_calls.entry(index) {
            Entry::Vacant(slot) => {
                slot.insert(ToolCall {
                    id: id.unwrap_or_default().to_owned(),
                    call_type: "function".to_owned(),
                    function: FunctionCall {
                        name: name.to_owned(),
                        arguments: arguments.to_owned(),
                    },
                });
            }
            Entry::Occupied(mut slot) => {
                let call = slot.get_mut();
                call.function.name.push_str(name);
                call.function.arguments.push_str(arguments);
                if let Some(id) = id {
                    id.clone_into(&mut call.id);
                }
            }
        }
    }

    fn into_choice(self, index: u32) -> ChatChoice {
        let content = self
            .content
            .or_else(|| self.tool_calls.is_empty().then(String::new));
        let mut message = ChatMessage::new(MessageRole::Assistant, String::new());
        message.content = content.map(MessageContent::Text);
        if !self.reasoning_content.is_empty() {
            message.reasoning_content = Some(self.reasoning_content);
        }
        if !self.tool_calls.is_empty() {
            message.tool_calls = Some(self.tool_calls.into_values().collect());
        }
        ChatChoice {
            index,
            message,
            finish_reason: self.finish_reason,
            extra: self.extra,
        }
    }
}

/// Fold streamed chat completion chunks into one response
///
/// `requested_model` is used when no chunk names a model. The result always
/// contains at least choice 0.
#[must_use]
pub fn aggregate_chat_chunks(chunks: &[Value], requested_model: &str) -> ChatCompletionResponse {
    let mut header = StreamHeader::default();
    let mut choices: BTreeMap<u32, ChatChoiceState> = BTreeMap::new();

    for chunk in chunks {
        header.observe(chunk);
        for choice in choices_of(chunk) {
            choices
                .entry(choice_index(choice))
                .or_default()
                .observe(choice);
        }
    }
    choices.entry(0).or_default();

    ChatCompletionResponse {
        id: header.resolve_id("chatcmpl"),
        object: CHAT_COMPLETION_OBJECT.to_owned(),
        created: header.resolve_created(),
        model: header.resolve_model(requested_model),
        choices: choices
            .into_iter()
            .map(|(index, state)| state.into_choice(index))
            .collect(),
        usage: header.usage,
        extra: header.extra,
    }
}

// ============================================================================
// Text Completions
// ============================================================================

/// Per-choice accumulator for text completion chunks
#[derive(Debug, Default)]
struct TextChoiceState {
    text: String,
    finish_reason: Option<String>,
    extra: Extra,
}

/// Fold streamed text completion chunks into one response
///
/// Text fields are concatenated directly; there is no `delta` wrapper.
#[must_use]
pub fn aggregate_completion_chunks(
    chunks: &[Value],
    requested_model: &str,
) -> TextCompletionResponse {
    let mut header = StreamHeader::default();
    let mut choices: BTreeMap<u32, TextChoiceState> = BTreeMap::new();

    for chunk in chunks {
        header.observe(chunk);
        for choice in choices_of(chunk) {
            let state = choices.entry(choice_index(choice)).or_default();
            if let Some(text) = choice.get("text").and_then(Value::as_str) {
                state.text.push_str(text);
            }
            if let Some(reason) = finish_reason_of(choice) {
                state.finish_reason = Some(reason.to_owned());
            }
            carry_extra(&mut state.extra, choice, &CHOICE_FIELDS);
        }
    }
    choices.entry(0).or_default();

    TextCompletionResponse {
        id: header.resolve_id("cmpl"),
        object: TEXT_COMPLETION_OBJECT.to_owned(),
        created: header.resolve_created(),
        model: header.resolve_model(requested_model),
        choices: choices
            .into_iter()
            .map(|(index, state)| TextChoice {
                index,
                text: state.text,
                finish_reason: state.finish_reason,
                extra: state.extra,
            })
            .collect(),
        usage: header.usage,
        extra: header.extra,
    }
}
