//! In-memory session store.

use std::collections::{HashMap, HashSet};

use super::buffer::StreamingBuffer;
use super::message::{Message, MessagePatch, MessageRole, WELCOME_ID_PREFIX};
use super::model::Session;
use crate::memory::{ExtractedMemory, MemoryReconciler};

/// Holds every session, the transient streaming buffer, and the memories
/// extracted while the current session has been active.
///
/// Pure state container: no I/O, every operation is atomic with respect to
/// one event's processing. The engine shares it behind an
/// `Arc<RwLock<SessionStore>>`.
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    current_session_id: Option<String>,
    streaming: Option<StreamingBuffer>,
    reconciler: MemoryReconciler,
    welcomed: HashSet<String>,
    welcome_message: String,
}

impl SessionStore {
    /// Creates an empty store. `welcome_message` is the content of the
    /// synthetic message injected into empty synced sessions.
    pub fn new(welcome_message: impl Into<String>) -> Self {
        Self {
            sessions: HashMap::new(),
            current_session_id: None,
            streaming: None,
            reconciler: MemoryReconciler::new(),
            welcomed: HashSet::new(),
            welcome_message: welcome_message.into(),
        }
    }

    /// Returns the session, creating it on first reference.
    pub fn ensure_session(&mut self, session_id: &str) -> &mut Session {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id))
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Replaces a session's message list with a server-authoritative one.
    ///
    /// Synthetic welcome messages are stripped from the input first so a
    /// round-tripped list never duplicates them; if the remaining list is
    /// empty, exactly one welcome message is injected and the session is
    /// recorded as welcomed.
    pub fn set_messages(&mut self, session_id: &str, messages: Vec<Message>) {
        let mut messages: Vec<Message> =
            messages.into_iter().filter(|m| !m.is_welcome()).collect();

        if messages.is_empty() {
            messages.push(self.welcome_message_for(session_id));
            self.welcomed.insert(session_id.to_string());
        }

        self.ensure_session(session_id).replace_messages(messages);
    }

    /// Idempotent append keyed on the message id. Duplicates are a silent
    /// no-op, never an error. Returns whether the message was inserted.
    pub fn add_message(&mut self, session_id: &str, message: Message) -> bool {
        let inserted = self.ensure_session(session_id).push_message(message);
        if !inserted {
            tracing::debug!(
                "[SessionStore] Ignoring duplicate message for session {}",
                session_id
            );
        }
        inserted
    }

    /// Merges a patch into an existing message; no-op if not found.
    pub fn update_message(
        &mut self,
        session_id: &str,
        message_id: &str,
        patch: MessagePatch,
    ) -> bool {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return false;
        };
        let Some(message) = session.message_mut(message_id) else {
            return false;
        };
        patch.apply_to(message);
        session.recompute();
        true
    }

    /// Replaces the streaming buffer.
    pub fn set_streaming(&mut self, buffer: Option<StreamingBuffer>) {
        self.streaming = buffer;
    }

    /// Functionally updates the streaming buffer; no-op if none is active.
    pub fn update_streaming(&mut self, update: impl FnOnce(&mut StreamingBuffer)) {
        if let Some(buffer) = self.streaming.as_mut() {
            update(buffer);
        }
    }

    pub fn streaming(&self) -> Option<&StreamingBuffer> {
        self.streaming.as_ref()
    }

    pub fn take_streaming(&mut self) -> Option<StreamingBuffer> {
        self.streaming.take()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }

    /// Switches the current session.
    ///
    /// Clears the session-scoped extracted-memories working list (extraction
    /// results are scoped to the active session) but never touches stored
    /// messages.
    pub fn select_session(&mut self, session_id: &str) {
        self.ensure_session(session_id);
        self.current_session_id = Some(session_id.to_string());
        self.reconciler.clear();
    }

    pub fn current_session_id(&self) -> Option<&str> {
        self.current_session_id.as_deref()
    }

    /// Messages of the currently selected session, or empty if none.
    pub fn current_messages(&self) -> &[Message] {
        self.current_session_id
            .as_deref()
            .and_then(|id| self.sessions.get(id))
            .map(Session::messages)
            .unwrap_or(&[])
    }

    pub fn reconciler(&self) -> &MemoryReconciler {
        &self.reconciler
    }

    pub fn reconciler_mut(&mut self) -> &mut MemoryReconciler {
        &mut self.reconciler
    }

    /// The memories surfaced while the current session has been active.
    pub fn extracted_memories(&self) -> &[ExtractedMemory] {
        self.reconciler.memories()
    }

    fn welcome_message_for(&self, session_id: &str) -> Message {
        let mut message = Message::assistant(self.welcome_message.clone());
        message.id = format!("{WELCOME_ID_PREFIX}{session_id}");
        message
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(crate::config::EngineConfig::default().welcome_message)
    }
}
