//! Wire-level event types for one streaming turn.
//!
//! Payloads are deliberately loose: every field besides the `type`
//! discriminator is optional, because the backend emits malformed events
//! and the interpreter must degrade to a no-op instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::normalize;
use crate::memory::ExtractedMemory;

/// Discriminator for the event kinds a turn stream can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Start,
    UserMessage,
    Content,
    AssistantMessage,
    MessageComplete,
    MemoryExtracted,
    Error,
    Done,
    /// Any kind this client does not know; tolerated and skipped.
    #[default]
    #[serde(other)]
    Unknown,
}

/// A loosely-typed memory payload as the backend sends it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireMemory {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, alias = "content")]
    pub input: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "memoryType")]
    pub memory_type: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

impl WireMemory {
    /// Normalizes into the domain type, degrading to a placeholder when the
    /// payload has no content.
    pub fn into_extracted(self) -> ExtractedMemory {
        let input = self.input.filter(|s| !s.trim().is_empty());
        match input {
            Some(input) => ExtractedMemory {
                id: self.id,
                input,
                confidence: self.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
                tags: self.tags,
                memory_type: self
                    .memory_type
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| "unknown".to_string()),
                created_at: self
                    .created_at
                    .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
                placeholder: false,
            },
            None => match self.id {
                Some(id) => ExtractedMemory::id_placeholder(id),
                None => ExtractedMemory::count_placeholder(),
            },
        }
    }
}

/// A message as the backend sends it: typed common fields plus a flattened
/// extras map for everything the backend spells inconsistently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WireMessage {
    /// The message `metadata` object, or empty.
    pub fn metadata(&self) -> Map<String, Value> {
        self.extra
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Extracted memories, read from either casing at the top level and
    /// inside `metadata`.
    pub fn memories_extracted(&self) -> Vec<WireMemory> {
        let top = normalize::memory_list(&self.extra, "memories_extracted", "memoriesExtracted");
        if !top.is_empty() {
            return top;
        }
        normalize::memory_list(&self.metadata(), "memories_extracted", "memoriesExtracted")
    }

    /// Consulted-context references, read from either casing at the top
    /// level and inside `metadata`.
    pub fn context_used(&self) -> Vec<String> {
        let top = normalize::string_list(&self.extra, "context_used", "contextUsed");
        if !top.is_empty() {
            return top;
        }
        normalize::string_list(&self.metadata(), "context_used", "contextUsed")
    }
}

/// The `summary` side payload any event may carry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WireSummary {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WireSummary {
    pub fn memories_extracted(&self) -> Vec<WireMemory> {
        normalize::memory_list(&self.extra, "memories_extracted", "memoriesExtracted")
    }

    pub fn total_memories_extracted(&self) -> Option<usize> {
        normalize::count(
            &self.extra,
            "total_memories_extracted",
            "totalMemoriesExtracted",
        )
    }
}

/// One event of a turn stream.
#[derive(Debug, Clone, Deserialize)]
pub struct TurnEvent {
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message: Option<WireMessage>,
    #[serde(default, alias = "memoryId")]
    pub memory_id: Option<String>,
    #[serde(default)]
    pub memory: Option<WireMemory>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub summary: Option<WireSummary>,
    #[serde(default, alias = "contextUsed")]
    pub context_used: Option<Vec<String>>,
}

impl Default for TurnEvent {
    fn default() -> Self {
        Self {
            kind: EventKind::Unknown,
            content: None,
            message: None,
            memory_id: None,
            memory: None,
            error: None,
            summary: None,
            context_used: None,
        }
    }
}

impl TurnEvent {
    fn of_kind(kind: EventKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn start() -> Self {
        Self::of_kind(EventKind::Start)
    }

    pub fn content(delta: impl Into<String>) -> Self {
        Self {
            content: Some(delta.into()),
            ..Self::of_kind(EventKind::Content)
        }
    }

    pub fn user_message(context_used: Vec<String>) -> Self {
        Self {
            context_used: Some(context_used),
            ..Self::of_kind(EventKind::UserMessage)
        }
    }

    pub fn assistant_message(message: WireMessage) -> Self {
        Self {
            message: Some(message),
            ..Self::of_kind(EventKind::AssistantMessage)
        }
    }

    pub fn message_complete(message: WireMessage) -> Self {
        Self {
            message: Some(message),
            ..Self::of_kind(EventKind::MessageComplete)
        }
    }

    pub fn memory_extracted(memory: WireMemory) -> Self {
        Self {
            memory: Some(memory),
            ..Self::of_kind(EventKind::MemoryExtracted)
        }
    }

    pub fn memory_extracted_id(id: impl Into<String>) -> Self {
        Self {
            memory_id: Some(id.into()),
            ..Self::of_kind(EventKind::MemoryExtracted)
        }
    }

    pub fn error(payload: impl Into<String>) -> Self {
        Self {
            error: Some(payload.into()),
            ..Self::of_kind(EventKind::Error)
        }
    }

    pub fn done() -> Self {
        Self::of_kind(EventKind::Done)
    }

    pub fn with_summary(mut self, summary: WireSummary) -> Self {
        self.summary = Some(summary);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> TurnEvent {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn kind_deserializes_snake_case_and_tolerates_unknown() {
        assert_eq!(parse(json!({"type": "content"})).kind, EventKind::Content);
        assert_eq!(
            parse(json!({"type": "message_complete"})).kind,
            EventKind::MessageComplete
        );
        assert_eq!(
            parse(json!({"type": "heartbeat"})).kind,
            EventKind::Unknown
        );
        assert_eq!(parse(json!({})).kind, EventKind::Unknown);
    }

    #[test]
    fn content_event_with_missing_payload_is_tolerated() {
        let event = parse(json!({"type": "content"}));
        assert_eq!(event.kind, EventKind::Content);
        assert!(event.content.is_none());
    }

    #[test]
    fn memory_id_reads_either_casing() {
        assert_eq!(
            parse(json!({"type": "memory_extracted", "memoryId": "m1"}))
                .memory_id
                .as_deref(),
            Some("m1")
        );
        assert_eq!(
            parse(json!({"type": "memory_extracted", "memory_id": "m2"}))
                .memory_id
                .as_deref(),
            Some("m2")
        );
    }

    #[test]
    fn wire_message_reads_memories_from_both_casings() {
        let snake: WireMessage = serde_json::from_value(json!({
            "id": "a1",
            "memories_extracted": [{"id": "m1", "input": "x"}],
        }))
        .unwrap();
        let camel: WireMessage = serde_json::from_value(json!({
            "id": "a1",
            "memoriesExtracted": [{"id": "m1", "input": "x"}],
        }))
        .unwrap();
        assert_eq!(snake.memories_extracted().len(), 1);
        assert_eq!(camel.memories_extracted().len(), 1);
    }

    #[test]
    fn wire_message_falls_back_to_metadata() {
        let message: WireMessage = serde_json::from_value(json!({
            "id": "a1",
            "metadata": {
                "memoriesExtracted": [{"id": "m1", "input": "x"}],
                "context_used": ["mem-9"],
            },
        }))
        .unwrap();
        assert_eq!(message.memories_extracted().len(), 1);
        assert_eq!(message.context_used(), ["mem-9"]);
    }

    #[test]
    fn summary_exposes_total_count() {
        let event = parse(json!({
            "type": "content",
            "content": "hi",
            "summary": {"memories_extracted": [], "totalMemoriesExtracted": 3},
        }));
        let summary = event.summary.unwrap();
        assert_eq!(summary.total_memories_extracted(), Some(3));
        assert!(summary.memories_extracted().is_empty());
    }

    #[test]
    fn wire_memory_normalization_clamps_and_defaults() {
        let memory: WireMemory = serde_json::from_value(json!({
            "id": "m1",
            "content": "likes rust",
            "confidence": 3.5,
        }))
        .unwrap();
        let extracted = memory.into_extracted();
        assert_eq!(extracted.input, "likes rust");
        assert_eq!(extracted.confidence, 1.0);
        assert_eq!(extracted.memory_type, "unknown");
        assert!(!extracted.placeholder);
    }

    #[test]
    fn contentless_wire_memory_becomes_placeholder() {
        let memory = WireMemory {
            id: Some("m1".to_string()),
            ..Default::default()
        };
        let extracted = memory.into_extracted();
        assert!(extracted.placeholder);
        assert_eq!(extracted.id.as_deref(), Some("m1"));
    }
}
