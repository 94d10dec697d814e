//! Grouping of message rows into conversations.
//!
//! Conversations are kept in first-appearance order and each one remembers the
//! input rows that belong to it, in input order. This is the conversation
//! skeleton the conversation-level table is built on.

use crate::table::ChatMessage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The rows belonging to one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationGroup {
    /// Grouping key
    pub conversation_num: String,
    /// Indices into the message table, in input order
    pub rows: Vec<usize>,
}

impl ConversationGroup {
    /// Create an empty group for a conversation.
    pub fn new(conversation_num: impl Into<String>) -> Self {
        Self {
            conversation_num: conversation_num.into(),
            rows: Vec::new(),
        }
    }

    /// Number of messages in the conversation.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve the group's rows against the message table.
    pub fn messages<'a>(&self, all: &'a [ChatMessage]) -> Vec<&'a ChatMessage> {
        self.rows.iter().map(|&i| &all[i]).collect()
    }

    /// Pick this group's entries out of a per-row column.
    pub fn select(&self, column: &[f64]) -> Vec<f64> {
        self.rows.iter().map(|&i| column[i]).collect()
    }
}

/// Index of conversations over a message table.
#[derive(Debug, Clone, Default)]
pub struct ConversationIndex {
    /// Groups in first-appearance order
    groups: Vec<ConversationGroup>,
    /// Conversation key to position in `groups`
    lookup: HashMap<String, usize>,
    /// Total rows seen
    row_count: usize,
}

impl ConversationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index for a full message table.
    pub fn build(messages: &[ChatMessage]) -> Self {
        let mut index = Self::new();
        for message in messages {
            index.process_message(&message.conversation_num);
        }
        index
    }

    /// Assign the next row to its conversation, opening a new group on first sight.
    pub fn process_message(&mut self, conversation_num: &str) {
        let row = self.row_count;
        let position = match self.lookup.get(conversation_num) {
            Some(&position) => position,
            None => {
                self.groups.push(ConversationGroup::new(conversation_num));
                self.lookup
                    .insert(conversation_num.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[position].rows.push(row);
        self.row_count += 1;
    }

    /// Conversation groups in first-appearance order.
    pub fn groups(&self) -> &[ConversationGroup] {
        &self.groups
    }

    /// Conversation keys in first-appearance order.
    pub fn conversation_nums(&self) -> Vec<&str> {
        self.groups
            .iter()
            .map(|g| g.conversation_num.as_str())
            .collect()
    }

    /// Number of distinct conversations.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of rows indexed.
    pub fn row_count(&self) -> usize {
        self.row_count
    }
}
