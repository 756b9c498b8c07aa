//! The transport seam between the engine and the backend.
//!
//! The engine consumes the backend as an opaque "send a turn, receive an
//! event stream" capability plus a full-session sync; `colloquy-client`
//! provides the HTTP/SSE implementation.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::protocol::{TurnEvent, WireMessage};
use crate::session::{Message, MessageRole};

/// The ordered event sequence for one turn. Items error only on
/// transport-level failures; protocol `error` events arrive as `Ok`.
pub type EventStream = BoxStream<'static, Result<TurnEvent, TransportError>>;

/// Server-side session metadata returned by a full sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// An authoritative snapshot of one session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSync {
    pub session: SessionMeta,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}

impl SessionSync {
    /// Converts the synced wire messages into domain messages, dropping
    /// nothing: messages without ids or timestamps get generated ones.
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
            .into_iter()
            .map(|wire| {
                let memories = wire
                    .memories_extracted()
                    .into_iter()
                    .map(|m| m.into_extracted())
                    .collect();
                let context_used = wire.context_used();
                Message {
                    id: wire
                        .id
                        .clone()
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                    role: MessageRole::parse_or(wire.role.as_deref(), MessageRole::User),
                    content: wire.content.clone().unwrap_or_default(),
                    timestamp: wire
                        .timestamp
                        .clone()
                        .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
                    memories_extracted: memories,
                    context_used,
                    metadata: wire.metadata(),
                }
            })
            .collect()
    }
}

/// Capability the engine consumes to talk to the backend.
#[async_trait]
pub trait TurnTransport: Send + Sync {
    /// Submits a user turn and opens the event channel for its response.
    async fn send_turn(&self, session_id: &str, text: &str)
    -> Result<EventStream, TransportError>;

    /// Fetches the authoritative message list for a session.
    async fn fetch_session(&self, session_id: &str) -> Result<SessionSync, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sync_conversion_fills_missing_fields() {
        let sync: SessionSync = serde_json::from_value(json!({
            "session": {"id": "s1", "title": "First chat"},
            "messages": [
                {"id": "u1", "role": "user", "content": "hello", "timestamp": "t1"},
                {"role": "assistant", "content": "hi", "contextUsed": ["mem-1"]},
            ],
        }))
        .unwrap();

        let messages = sync.into_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].id, "u1");
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert!(!messages[1].id.is_empty());
        assert_eq!(messages[1].context_used, ["mem-1"]);
    }

    #[test]
    fn sync_tolerates_missing_message_list() {
        let sync: SessionSync =
            serde_json::from_value(json!({"session": {"id": "s1"}})).unwrap();
        assert!(sync.into_messages().is_empty());
    }
}
