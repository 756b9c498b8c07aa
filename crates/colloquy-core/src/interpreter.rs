//! The event interpreter: maps one incoming protocol event to store
//! mutations.
//!
//! Each call applies exactly the state change the event kind implies and
//! nothing else; any subset and ordering of non-`content` events around the
//! `content` deltas is tolerated, and malformed payloads degrade to no-ops
//! for the missing aspect instead of failing the turn.

use crate::config::EngineConfig;
use crate::protocol::{EventKind, TurnEvent, WireMemory, WireMessage};
use crate::session::{Message, MessageRole, SessionStore, StreamingBuffer};

/// What the driver should do after applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Keep consuming events.
    Continue,
    /// The turn reached a clean terminal state.
    Completed,
    /// The turn failed with a caller-visible notice. Partial content has
    /// already been flushed into the session.
    Failed(String),
}

/// Applies one event, in arrival order, for the turn bound to `session_id`.
pub fn apply(
    store: &mut SessionStore,
    config: &EngineConfig,
    session_id: &str,
    event: &TurnEvent,
) -> Disposition {
    // Extraction can be reported early: any event may carry a summary.
    fold_summary(store, event);

    match event.kind {
        EventKind::Start => Disposition::Continue,

        EventKind::UserMessage => {
            let context = event
                .context_used
                .clone()
                .filter(|c| !c.is_empty())
                .or_else(|| {
                    event
                        .message
                        .as_ref()
                        .map(WireMessage::context_used)
                        .filter(|c| !c.is_empty())
                });
            if let Some(context) = context {
                store.update_streaming(|buffer| buffer.merge_context(&context));
            }
            Disposition::Continue
        }

        EventKind::Content => {
            if let Some(delta) = event.content.as_deref() {
                if store.streaming().is_none() {
                    store.set_streaming(Some(StreamingBuffer::new(session_id)));
                }
                store.update_streaming(|buffer| buffer.push_content(delta));
            }
            Disposition::Continue
        }

        EventKind::AssistantMessage | EventKind::MessageComplete => {
            finalize(store, session_id, event.message.as_ref());
            Disposition::Completed
        }

        EventKind::MemoryExtracted => {
            if let Some(memory) = event.memory.clone() {
                store.reconciler_mut().fold(memory.into_extracted());
            } else if let Some(id) = event.memory_id.as_deref() {
                store.reconciler_mut().fold_id_only(id);
            }
            Disposition::Continue
        }

        EventKind::Error => {
            let payload = event.error.clone().unwrap_or_default();
            flush_pending(store, session_id);
            if config.is_misreported_memory_token(&payload) {
                // Known backend defect: a memory-type token lands in the
                // error channel on an otherwise successful turn.
                tracing::debug!(
                    "[Interpreter] Ignoring misreported memory-type error '{}'",
                    payload.trim()
                );
                Disposition::Completed
            } else {
                let notice = if payload.is_empty() {
                    "stream error".to_string()
                } else {
                    payload
                };
                Disposition::Failed(notice)
            }
        }

        EventKind::Done => {
            flush_pending(store, session_id);
            Disposition::Completed
        }

        EventKind::Unknown => {
            tracing::debug!("[Interpreter] Skipping unknown event kind");
            Disposition::Continue
        }
    }
}

/// Flushes the streaming buffer into the session as an assistant message,
/// unless it is empty or a terminal event already inserted it (detected by
/// assistant-role + buffer-start-timestamp equality). Always clears the
/// buffer. Returns whether a message was inserted.
pub(crate) fn flush_pending(store: &mut SessionStore, session_id: &str) -> bool {
    let Some(buffer) = store.take_streaming() else {
        return false;
    };
    if !buffer.has_content() {
        return false;
    }
    let already_inserted = store
        .session(session_id)
        .map(|s| s.has_assistant_message_at(&buffer.started_at))
        .unwrap_or(false);
    if already_inserted {
        tracing::debug!(
            "[Interpreter] Buffer for session {} already finalized, skipping flush",
            session_id
        );
        return false;
    }
    store.add_message(session_id, buffer.into_message());
    true
}

/// Inserts the terminal event's message, merging in whatever the buffer
/// accumulated, and clears the buffer. A terminal event without a message
/// object still clears the buffer even though nothing can be inserted.
fn finalize(store: &mut SessionStore, session_id: &str, wire: Option<&WireMessage>) {
    let buffer = store.take_streaming();

    let Some(wire) = wire else {
        tracing::warn!(
            "[Interpreter] Terminal event without message for session {}; buffer cleared",
            session_id
        );
        return;
    };

    let memories: Vec<_> = wire
        .memories_extracted()
        .into_iter()
        .map(WireMemory::into_extracted)
        .collect();
    for memory in &memories {
        store.reconciler_mut().fold(memory.clone());
    }

    let content = wire
        .content
        .clone()
        .filter(|c| !c.is_empty())
        .or_else(|| buffer.as_ref().map(|b| b.content.clone()))
        .unwrap_or_default();

    let mut context_used = wire.context_used();
    if context_used.is_empty() {
        if let Some(buffer) = &buffer {
            context_used = buffer.context_used.clone();
        }
    }

    // Buffered turns stamp the buffer's start time so a trailing `done`
    // can recognize the content as already inserted.
    let timestamp = buffer
        .as_ref()
        .map(|b| b.started_at.clone())
        .or_else(|| wire.timestamp.clone())
        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

    let message = Message {
        id: wire
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        role: MessageRole::parse_or(wire.role.as_deref(), MessageRole::Assistant),
        content,
        timestamp,
        memories_extracted: memories,
        context_used,
        metadata: wire.metadata(),
    };
    store.add_message(session_id, message);
}

fn fold_summary(store: &mut SessionStore, event: &TurnEvent) {
    let Some(summary) = &event.summary else {
        return;
    };
    for memory in summary.memories_extracted() {
        store.reconciler_mut().fold(memory.into_extracted());
    }
    if let Some(total) = summary.total_memories_extracted() {
        store.reconciler_mut().expand_to_count(total);
    }
}
