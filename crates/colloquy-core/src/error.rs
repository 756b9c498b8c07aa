//! Error types for the Colloquy engine.

use std::time::Duration;

use thiserror::Error;

/// Failures reported by a [`crate::transport::TurnTransport`] implementation.
///
/// These cover the channel itself (connect/close failures, HTTP status
/// errors, undecodable responses), never the protocol-level `error` events
/// that arrive *inside* a healthy stream; those are handled by the event
/// interpreter.
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// The channel could not be opened or closed abnormally.
    #[error("connection failed: {message}")]
    Connection { message: String, is_retryable: bool },

    /// The backend answered with a non-success HTTP status.
    #[error("request failed with status {status}: {message}")]
    Status {
        status: u16,
        message: String,
        is_retryable: bool,
        retry_after: Option<Duration>,
    },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Creates a connection failure.
    pub fn connection(message: impl Into<String>, is_retryable: bool) -> Self {
        Self::Connection {
            message: message.into(),
            is_retryable,
        }
    }

    /// Creates a malformed-response failure.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    /// Whether retrying the request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { is_retryable, .. } | Self::Status { is_retryable, .. } => {
                *is_retryable
            }
            Self::Malformed(_) => false,
        }
    }
}

/// A shared error type for the Colloquy engine.
///
/// Every failure mode degrades to "turn did not complete cleanly, but state
/// remains consistent and inspectable"; nothing here is fatal to the hosting
/// process.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A turn was submitted while another one is still streaming.
    #[error("a turn is already streaming for session '{session_id}'")]
    TurnInProgress { session_id: String },

    /// The transport failed before or during the turn. Any partial
    /// assistant content has already been flushed into the session.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The stream delivered a genuine protocol-level error event. Any
    /// partial assistant content has already been flushed into the session.
    #[error("turn failed: {0}")]
    Turn(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error (config file access)
    #[error("io error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Creates a TurnInProgress error.
    pub fn turn_in_progress(session_id: impl Into<String>) -> Self {
        Self::TurnInProgress {
            session_id: session_id.into(),
        }
    }

    /// Creates a Turn error.
    pub fn turn(message: impl Into<String>) -> Self {
        Self::Turn(message.into())
    }

    /// Creates a Config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a TurnInProgress error
    pub fn is_turn_in_progress(&self) -> bool {
        matches!(self, Self::TurnInProgress { .. })
    }

    /// Check if this is a transport failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a protocol-level turn failure
    pub fn is_turn(&self) -> bool {
        matches!(self, Self::Turn(_))
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, EngineError>`.
pub type Result<T> = std::result::Result<T, EngineError>;
