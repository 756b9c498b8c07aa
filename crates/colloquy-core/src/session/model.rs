//! Session domain model.

use serde::Serialize;

use super::message::{Message, MessageRole};

/// A conversation session and its derived summary fields.
///
/// The summary fields (`message_count`, `last_message`,
/// `total_memories_extracted`) are recomputed from the message list on every
/// mutation and are not independently settable, so they can never drift from
/// the list itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: String,
    messages: Vec<Message>,
    message_count: usize,
    last_message: Option<String>,
    total_memories_extracted: usize,
}

impl Session {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            message_count: 0,
            last_message: None,
            total_memories_extracted: 0,
        }
    }

    /// The ordered message list (insertion order = conversation order).
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Count of genuine (non-welcome) messages.
    pub fn message_count(&self) -> usize {
        self.message_count
    }

    /// Content of the most recent assistant message, if any.
    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Total memories extracted across all stored messages.
    pub fn total_memories_extracted(&self) -> usize {
        self.total_memories_extracted
    }

    pub(crate) fn contains_message(&self, message_id: &str) -> bool {
        self.messages.iter().any(|m| m.id == message_id)
    }

    /// Whether an assistant message with the given timestamp already exists.
    /// Used to avoid re-flushing a buffer a terminal event already inserted.
    pub(crate) fn has_assistant_message_at(&self, timestamp: &str) -> bool {
        self.messages
            .iter()
            .any(|m| m.role == MessageRole::Assistant && m.timestamp == timestamp)
    }

    pub(crate) fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.recompute();
    }

    /// Appends a message; returns false if the id already exists.
    pub(crate) fn push_message(&mut self, message: Message) -> bool {
        if self.contains_message(&message.id) {
            return false;
        }
        self.messages.push(message);
        self.recompute();
        true
    }

    pub(crate) fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    pub(crate) fn recompute(&mut self) {
        self.message_count = self.messages.iter().filter(|m| !m.is_welcome()).count();
        self.last_message = self
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && !m.is_welcome())
            .map(|m| m.content.clone());
        self.total_memories_extracted = self
            .messages
            .iter()
            .map(|m| m.memories_extracted.len())
            .sum();
    }
}
