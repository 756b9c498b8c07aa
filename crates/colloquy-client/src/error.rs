//! Client-side error types.

use colloquy_core::TransportError;
use thiserror::Error;

/// Failures raised while constructing or configuring the client.
///
/// Request-level failures are reported directly as
/// [`TransportError`] by the [`crate::api::ChatApiClient`] methods.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    /// Required configuration was not found.
    #[error("missing configuration: {0}")]
    MissingConfig(String),
}

impl From<ClientError> for TransportError {
    fn from(err: ClientError) -> Self {
        TransportError::connection(err.to_string(), false)
    }
}
