//! The in-progress assistant message for the active turn.

use serde::Serialize;

use super::message::Message;

/// Accumulates the assistant message under construction during one
/// streaming turn.
///
/// At most one buffer is active at a time; it is created when a turn starts
/// and destroyed when the turn reaches any terminal state. `started_at` is
/// stamped onto any message finalized from this buffer, which is what lets
/// the `done` handler detect content a terminal event already inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamingBuffer {
    /// Session the turn was started for, captured at turn start. Events are
    /// always applied here, not to the currently displayed session.
    pub session_id: String,
    /// Concatenation of all content deltas received so far.
    pub content: String,
    /// Memory references retrieved to answer; arrives ahead of the content.
    pub context_used: Vec<String>,
    /// Turn start time (ISO 8601).
    pub started_at: String,
}

impl StreamingBuffer {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            content: String::new(),
            context_used: Vec::new(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Appends one content delta in arrival order.
    pub fn push_content(&mut self, delta: &str) {
        self.content.push_str(delta);
    }

    /// Merges retrieved-context references, keeping first-seen order.
    pub fn merge_context(&mut self, context: &[String]) {
        for entry in context {
            if !self.context_used.contains(entry) {
                self.context_used.push(entry.clone());
            }
        }
    }

    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    /// Finalizes the buffer into an assistant message stamped with the
    /// buffer's start time.
    pub fn into_message(self) -> Message {
        let mut message = Message::assistant(self.content);
        message.timestamp = self.started_at;
        message.context_used = self.context_used;
        message
    }
}
