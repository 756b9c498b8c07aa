//! Field-name normalization for the wire protocol.
//!
//! The backend inconsistently emits the same logical field under two casing
//! conventions (`memories_extracted` vs `memoriesExtracted`, `context_used`
//! vs `contextUsed`, ...). Every casing check in the crate lives here: both
//! spellings are read and the non-empty one wins.

use serde_json::{Map, Value};

use super::event::WireMemory;

/// Whether a JSON value carries usable content.
fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        _ => true,
    }
}

/// Resolves a field that may appear under either casing, preferring
/// whichever is non-empty (snake_case first on a tie).
pub fn dual_field<'a>(map: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    map.get(snake)
        .filter(|v| is_non_empty(v))
        .or_else(|| map.get(camel).filter(|v| is_non_empty(v)))
}

/// Reads a dual-cased list of strings.
pub fn string_list(map: &Map<String, Value>, snake: &str, camel: &str) -> Vec<String> {
    dual_field(map, snake, camel)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Reads a dual-cased list of memory payloads, dropping entries that do not
/// decode rather than failing the whole list.
pub fn memory_list(map: &Map<String, Value>, snake: &str, camel: &str) -> Vec<WireMemory> {
    dual_field(map, snake, camel)
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Reads a dual-cased non-negative count.
pub fn count(map: &Map<String, Value>, snake: &str, camel: &str) -> Option<usize> {
    dual_field(map, snake, camel)
        .and_then(Value::as_u64)
        .map(|n| n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn snake_case_wins_when_both_non_empty() {
        let m = map(json!({
            "context_used": ["snake"],
            "contextUsed": ["camel"],
        }));
        assert_eq!(string_list(&m, "context_used", "contextUsed"), ["snake"]);
    }

    #[test]
    fn empty_snake_falls_back_to_camel() {
        let m = map(json!({
            "context_used": [],
            "contextUsed": ["camel"],
        }));
        assert_eq!(string_list(&m, "context_used", "contextUsed"), ["camel"]);
    }

    #[test]
    fn missing_both_yields_empty() {
        let m = map(json!({}));
        assert!(string_list(&m, "context_used", "contextUsed").is_empty());
        assert!(memory_list(&m, "memories_extracted", "memoriesExtracted").is_empty());
        assert!(count(&m, "total_memories_extracted", "totalMemoriesExtracted").is_none());
    }

    #[test]
    fn undecodable_memory_entries_are_dropped() {
        let m = map(json!({
            "memories_extracted": [
                {"id": "m1", "input": "likes rust"},
                42,
            ],
        }));
        let memories = memory_list(&m, "memories_extracted", "memoriesExtracted");
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].id.as_deref(), Some("m1"));
    }

    #[test]
    fn count_reads_either_casing() {
        let m = map(json!({"totalMemoriesExtracted": 3}));
        assert_eq!(
            count(&m, "total_memories_extracted", "totalMemoriesExtracted"),
            Some(3)
        );
    }
}
