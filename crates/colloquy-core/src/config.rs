//! Engine configuration.
//!
//! The fallback-flush delay and the set of memory-type tokens the backend
//! misreports as errors are deployment-specific tuning values, so they live
//! here rather than as hardcoded constants.

use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Memory-type tokens the backend is known to emit inside `error` events
/// when memory extraction ran during the turn. An error payload matching
/// one of these (case-insensitively) is a completion, not a failure.
static DEFAULT_MISREPORTED_TOKENS: Lazy<Vec<String>> = Lazy::new(|| {
    ["EPISODIC", "SEMANTIC", "PROCEDURAL", "WORKING"]
        .into_iter()
        .map(str::to_string)
        .collect()
});

fn default_fallback_flush_delay_ms() -> u64 {
    1000
}

fn default_misreported_memory_tokens() -> Vec<String> {
    DEFAULT_MISREPORTED_TOKENS.clone()
}

fn default_welcome_message() -> String {
    "Hello! How can I help you today?".to_string()
}

/// Tunable settings for the session engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay before the stream driver flushes a still-unfinalized streaming
    /// buffer after channel open, guarding against transports that close
    /// without a terminal event.
    #[serde(default = "default_fallback_flush_delay_ms")]
    pub fallback_flush_delay_ms: u64,

    /// Error payloads matching one of these tokens are treated as clean
    /// completions (known backend defect).
    #[serde(default = "default_misreported_memory_tokens")]
    pub misreported_memory_tokens: Vec<String>,

    /// Content of the synthetic welcome message injected into sessions that
    /// sync down with an empty message list.
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_flush_delay_ms: default_fallback_flush_delay_ms(),
            misreported_memory_tokens: default_misreported_memory_tokens(),
            welcome_message: default_welcome_message(),
        }
    }
}

impl EngineConfig {
    /// The fallback-flush delay as a [`Duration`].
    pub fn fallback_flush_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_flush_delay_ms)
    }

    /// Whether an `error` event payload is one of the memory-type tokens
    /// the backend misreports as errors.
    pub fn is_misreported_memory_token(&self, payload: &str) -> bool {
        let payload = payload.trim();
        self.misreported_memory_tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(payload))
    }

    /// Parses a configuration from a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Loads a configuration from a TOML file.
    ///
    /// A missing file yields the default configuration, matching how the
    /// engine is expected to run with zero local setup.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("[EngineConfig] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.fallback_flush_delay(), Duration::from_millis(1000));
        assert_eq!(config.misreported_memory_tokens.len(), 4);
        assert!(!config.welcome_message.is_empty());
    }

    #[test]
    fn token_match_is_case_insensitive_and_trimmed() {
        let config = EngineConfig::default();
        assert!(config.is_misreported_memory_token("EPISODIC"));
        assert!(config.is_misreported_memory_token("episodic"));
        assert!(config.is_misreported_memory_token("  Semantic  "));
        assert!(!config.is_misreported_memory_token("connection reset"));
        assert!(!config.is_misreported_memory_token(""));
    }

    #[test]
    fn partial_toml_falls_back_to_field_defaults() {
        let config = EngineConfig::from_toml_str("fallback_flush_delay_ms = 250").unwrap();
        assert_eq!(config.fallback_flush_delay_ms, 250);
        assert_eq!(
            config.misreported_memory_tokens,
            EngineConfig::default().misreported_memory_tokens
        );
    }

    #[test]
    fn custom_token_set_replaces_default() {
        let config =
            EngineConfig::from_toml_str(r#"misreported_memory_tokens = ["CUSTOM"]"#).unwrap();
        assert!(config.is_misreported_memory_token("custom"));
        assert!(!config.is_misreported_memory_token("EPISODIC"));
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig::load_from_file(dir.path().join("config.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn load_from_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let original = EngineConfig {
            fallback_flush_delay_ms: 50,
            misreported_memory_tokens: vec!["EPISODIC".to_string()],
            welcome_message: "hi".to_string(),
        };
        std::fs::write(&path, toml::to_string(&original).unwrap()).unwrap();
        assert_eq!(EngineConfig::load_from_file(&path).unwrap(), original);
    }
}
