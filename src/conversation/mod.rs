// ABOUTME: Bounded in-memory conversation history keyed by caller-chosen ids
// ABOUTME: Keeps the most recent messages per conversation, oldest dropped first
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Conversation Store
//!
//! Process-lifetime chat history used by the `chat_completion` tool. Each
//! conversation is an ordered list of messages capped at `max_messages`; when
//! the cap is exceeded the oldest entries are dropped and survivors keep their
//! relative order. Nothing expires: an entry lives until `clear` or process exit.
//!
//! The store is an explicitly constructed value shared through `Arc`. Every
//! operation is synchronous, so a store read or write is never split by an
//! `.await`. `DashMap` shards the keys, so operations on different
//! conversations do not contend.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::constants::defaults::DEFAULT_CONVERSATION_MAX_MESSAGES;
use crate::llm::ChatMessage;

/// Message count of one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// Caller-chosen conversation id
    pub conversation_id: String,
    /// Messages currently stored
    pub message_count: usize,
}

/// Bounded per-conversation message history
#[derive(Debug)]
pub struct ConversationStore {
    conversations: DashMap<String, Vec<ChatMessage>>,
    max_messages: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERSATION_MAX_MESSAGES)
    }
}

impl ConversationStore {
    /// Create an empty store; a cap of zero is raised to one
    #[must_use]
    pub fn new(max_messages: usize) -> Self {
        Self {
            conversations: DashMap::new(),
            max_messages: max_messages.max(1),
        }
    }

    /// Configured cap
    #[must_use]
    pub const fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Copy of the history for `id`; empty for an unknown id
    #[must_use]
    pub fn get(&self, id: &str) -> Vec<ChatMessage> {
        self.conversations
            .get(id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Replace the whole history for `id`, keeping only the newest entries
    pub fn set(&self, id: &str, mut messages: Vec<ChatMessage>) {
        enforce_cap(&mut messages, self.max_messages);
        self.conversations.insert(id.to_owned(), messages);
    }

    /// Append to the history for `id`, creating it if needed, then apply the cap
    pub fn append(&self, id: &str, messages: impl IntoIterator<Item = ChatMessage>) {
        // Entry guard holds the shard lock for the whole read-modify-write
        let mut entry = self.conversations.entry(id.to_owned()).or_default();
        entry.extend(messages);
        enforce_cap(entry.value_mut(), self.max_messages);
    }

    /// Remove the history for `id`; returns whether anything was removed
    pub fn clear(&self, id: &str) -> bool {
        self.conversations.remove(id).is_some()
    }

    /// All known ids, sorted lexicographically
    #[must_use]
    pub fn list_conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .conversations
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Per-conversation message counts, sorted by id
    #[must_use]
    pub fn summaries(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .iter()
            .map(|entry| ConversationSummary {
                conversation_id: entry.key().clone(),
                message_count: entry.value().len(),
            })
            .collect();
        summaries.sort_unstable_by(|a, b| a.conversation_id.cmp(&b.conversation_id));
        summaries
    }

    /// Number of stored conversations
    #[must_use]
    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    /// Whether no conversation is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

/// Drop the oldest messages beyond `max_messages`
fn enforce_cap(messages: &mut Vec<ChatMessage>, max_messages: usize) {
    if messages.len() > max_messages {
        let excess = messages.len() - max_messages;
        messages.drain(..excess);
    }
}
