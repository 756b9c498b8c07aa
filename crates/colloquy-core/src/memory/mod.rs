//! Extracted-memory reconciliation.
//!
//! The backend reports "a memory was created" in several inconsistent
//! shapes: a full payload on a terminal event, a bare identifier on an
//! out-of-band notice, or just a count in a summary. This module folds all
//! of them into one normalized, deduplicated session-scoped list.

use serde::{Deserialize, Serialize};

/// Content used for a placeholder created from an id-only notice.
pub const ID_ONLY_PLACEHOLDER_INPUT: &str = "unknown (id only)";

/// Content used for a placeholder synthesized to reconcile a reported
/// extraction count with fewer observed payloads.
pub const COUNT_PLACEHOLDER_INPUT: &str = "pending extraction";

fn default_memory_type() -> String {
    "unknown".to_string()
}

fn is_false(value: &bool) -> bool {
    !value
}

/// A memory the backend extracted during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMemory {
    /// Backend identifier; absent for count-reconciliation placeholders.
    #[serde(default)]
    pub id: Option<String>,
    /// The extracted text.
    pub input: String,
    /// Extraction confidence in `[0, 1]`.
    #[serde(default)]
    pub confidence: f32,
    /// Categorization tags, in backend order.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Memory taxonomy bucket (episodic, semantic, ...).
    #[serde(default = "default_memory_type")]
    pub memory_type: String,
    /// Creation timestamp (ISO 8601).
    #[serde(default)]
    pub created_at: String,
    /// Whether this entry stands in for a memory whose content was never
    /// observed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub placeholder: bool,
}

impl ExtractedMemory {
    /// Creates a placeholder for a notice that carried only an identifier.
    pub fn id_placeholder(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            input: ID_ONLY_PLACEHOLDER_INPUT.to_string(),
            confidence: 0.0,
            tags: Vec::new(),
            memory_type: default_memory_type(),
            created_at: chrono::Utc::now().to_rfc3339(),
            placeholder: true,
        }
    }

    /// Creates an id-less placeholder used to pad the list up to a count
    /// the backend reported without content.
    pub fn count_placeholder() -> Self {
        Self {
            id: None,
            input: COUNT_PLACEHOLDER_INPUT.to_string(),
            confidence: 0.0,
            tags: Vec::new(),
            memory_type: default_memory_type(),
            created_at: chrono::Utc::now().to_rfc3339(),
            placeholder: true,
        }
    }
}

/// Folds extraction notices into a session-scoped, deduplicated list.
///
/// Deduplication is keyed on `id` when present; id-less concrete memories
/// fall back to best-effort structural identity (input + memory type).
/// Placeholders never participate in structural matching, so a
/// count-reconciliation placeholder is never conflated with a later
/// identical-content memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryReconciler {
    memories: Vec<ExtractedMemory>,
}

impl MemoryReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one memory into the list.
    ///
    /// An id match replaces an earlier placeholder with the concrete
    /// payload; otherwise the first observation wins.
    pub fn fold(&mut self, memory: ExtractedMemory) {
        if let Some(id) = memory.id.as_deref() {
            if let Some(existing) = self
                .memories
                .iter_mut()
                .find(|m| m.id.as_deref() == Some(id))
            {
                if existing.placeholder && !memory.placeholder {
                    tracing::debug!("[MemoryReconciler] Upgrading placeholder memory {}", id);
                    *existing = memory;
                }
                return;
            }
            self.memories.push(memory);
            return;
        }

        if !memory.placeholder
            && self.memories.iter().any(|m| {
                !m.placeholder
                    && m.id.is_none()
                    && m.input == memory.input
                    && m.memory_type == memory.memory_type
            })
        {
            return;
        }
        self.memories.push(memory);
    }

    /// Folds an id-only notice as a placeholder entry.
    pub fn fold_id_only(&mut self, id: &str) {
        self.fold(ExtractedMemory::id_placeholder(id));
    }

    /// Pads the list with placeholders until it reaches `reported_total`,
    /// so aggregate counts stay consistent with the backend's own tally.
    pub fn expand_to_count(&mut self, reported_total: usize) {
        if reported_total > self.memories.len() {
            tracing::debug!(
                "[MemoryReconciler] Backend reported {} memories, observed {}; padding",
                reported_total,
                self.memories.len()
            );
        }
        while self.memories.len() < reported_total {
            self.memories.push(ExtractedMemory::count_placeholder());
        }
    }

    /// The reconciled list, in observation order.
    pub fn memories(&self) -> &[ExtractedMemory] {
        &self.memories
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    /// Drops all entries. Called when the active session changes.
    pub fn clear(&mut self) {
        self.memories.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn concrete(id: Option<&str>, input: &str) -> ExtractedMemory {
        ExtractedMemory {
            id: id.map(str::to_string),
            input: input.to_string(),
            confidence: 0.9,
            tags: vec!["test".to_string()],
            memory_type: "episodic".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            placeholder: false,
        }
    }

    #[test]
    fn fold_dedups_by_id() {
        let mut reconciler = MemoryReconciler::new();
        reconciler.fold(concrete(Some("m1"), "likes rust"));
        reconciler.fold(concrete(Some("m1"), "likes rust"));
        assert_eq!(reconciler.len(), 1);
    }

    #[test]
    fn id_placeholder_upgraded_by_later_payload() {
        let mut reconciler = MemoryReconciler::new();
        reconciler.fold_id_only("m1");
        assert!(reconciler.memories()[0].placeholder);

        reconciler.fold(concrete(Some("m1"), "likes rust"));
        assert_eq!(reconciler.len(), 1);
        assert!(!reconciler.memories()[0].placeholder);
        assert_eq!(reconciler.memories()[0].input, "likes rust");
    }

    #[test]
    fn concrete_payload_never_downgraded_to_placeholder() {
        let mut reconciler = MemoryReconciler::new();
        reconciler.fold(concrete(Some("m1"), "likes rust"));
        reconciler.fold_id_only("m1");
        assert_eq!(reconciler.len(), 1);
        assert_eq!(reconciler.memories()[0].input, "likes rust");
    }

    #[test]
    fn idless_memories_dedup_structurally() {
        let mut reconciler = MemoryReconciler::new();
        reconciler.fold(concrete(None, "likes rust"));
        reconciler.fold(concrete(None, "likes rust"));
        reconciler.fold(concrete(None, "dislikes mondays"));
        assert_eq!(reconciler.len(), 2);
    }

    #[test]
    fn count_placeholders_are_not_conflated_with_identical_content() {
        let mut reconciler = MemoryReconciler::new();
        reconciler.expand_to_count(1);
        let mut identical = concrete(None, COUNT_PLACEHOLDER_INPUT);
        identical.memory_type = default_memory_type();
        reconciler.fold(identical);
        assert_eq!(reconciler.len(), 2);
    }

    #[test]
    fn expand_to_count_pads_exactly() {
        let mut reconciler = MemoryReconciler::new();
        reconciler.fold(concrete(Some("m1"), "likes rust"));
        reconciler.expand_to_count(3);
        assert_eq!(reconciler.len(), 3);
        assert_eq!(
            reconciler.memories().iter().filter(|m| m.placeholder).count(),
            2
        );

        // A smaller or equal report never shrinks the list.
        reconciler.expand_to_count(2);
        assert_eq!(reconciler.len(), 3);
    }

    #[test]
    fn clear_empties_the_list() {
        let mut reconciler = MemoryReconciler::new();
        reconciler.fold_id_only("m1");
        reconciler.clear();
        assert!(reconciler.is_empty());
    }
}
