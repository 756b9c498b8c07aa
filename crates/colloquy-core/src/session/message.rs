//! Conversation message types.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::memory::ExtractedMemory;

/// Id prefix marking the synthetic welcome message the store injects into
/// freshly-synced empty sessions.
pub const WELCOME_ID_PREFIX: &str = "welcome-";

/// Represents the role of a message in a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

impl MessageRole {
    /// Best-effort parse of a wire role string.
    pub fn parse_or(value: Option<&str>, fallback: MessageRole) -> MessageRole {
        value
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(fallback)
    }
}

/// A single message in a session's conversation history.
///
/// `id` is the idempotency key: the store never holds two messages with the
/// same id in one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    /// Creation time (ISO 8601), assigned once.
    pub timestamp: String,
    /// Memories extracted while generating this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memories_extracted: Vec<ExtractedMemory>,
    /// Memory references consulted to produce this message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_used: Vec<String>,
    /// Open map for forward-compatible fields.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    /// Creates a user message with a fresh id and timestamp.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// Creates an assistant message with a fresh id and timestamp.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            memories_extracted: Vec::new(),
            context_used: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Whether this is the store-injected synthetic welcome message.
    pub fn is_welcome(&self) -> bool {
        self.id.starts_with(WELCOME_ID_PREFIX)
    }
}

/// A partial update merged into an existing message by
/// [`crate::session::SessionStore::update_message`].
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub memories_extracted: Option<Vec<ExtractedMemory>>,
    pub context_used: Option<Vec<String>>,
    /// Keys merged into the message metadata map.
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl MessagePatch {
    /// Applies this patch to a message, field by field.
    pub(crate) fn apply_to(self, message: &mut Message) {
        if let Some(content) = self.content {
            message.content = content;
        }
        if let Some(memories) = self.memories_extracted {
            message.memories_extracted = memories;
        }
        if let Some(context) = self.context_used {
            message.context_used = context;
        }
        if let Some(metadata) = self.metadata {
            for (key, value) in metadata {
                message.metadata.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_is_case_insensitive_with_fallback() {
        assert_eq!(
            MessageRole::parse_or(Some("Assistant"), MessageRole::User),
            MessageRole::Assistant
        );
        assert_eq!(
            MessageRole::parse_or(Some("narrator"), MessageRole::Assistant),
            MessageRole::Assistant
        );
        assert_eq!(
            MessageRole::parse_or(None, MessageRole::User),
            MessageRole::User
        );
    }

    #[test]
    fn welcome_detection_uses_id_prefix() {
        let mut message = Message::assistant("hi");
        assert!(!message.is_welcome());
        message.id = format!("{WELCOME_ID_PREFIX}s1");
        assert!(message.is_welcome());
    }

    #[test]
    fn patch_merges_metadata_instead_of_replacing() {
        let mut message = Message::assistant("hi");
        message
            .metadata
            .insert("kept".to_string(), serde_json::json!(true));

        let mut patch_meta = serde_json::Map::new();
        patch_meta.insert("added".to_string(), serde_json::json!(1));
        MessagePatch {
            content: Some("updated".to_string()),
            metadata: Some(patch_meta),
            ..Default::default()
        }
        .apply_to(&mut message);

        assert_eq!(message.content, "updated");
        assert_eq!(message.metadata.len(), 2);
    }

    #[test]
    fn serde_skips_empty_optional_fields() {
        let message = Message::user("hello");
        let json = serde_json::to_value(&message).unwrap();
        assert!(json.get("memories_extracted").is_none());
        assert!(json.get("context_used").is_none());
        assert_eq!(json["role"], "user");
    }
}
