//! HTTP/SSE transport for the Colloquy session engine.
//!
//! Implements the engine's `TurnTransport` seam over the backend's REST
//! API: a streaming POST opens the turn channel (Server-Sent Events, one
//! JSON event per `data:` frame) and a GET hydrates full sessions.
//!
//! # Module Structure
//!
//! - `api`: the reqwest-based [`ChatApiClient`]
//! - `sse`: incremental `data:`-frame decoding ([`TurnEventStream`])
//! - `error`: client-side error types

pub mod api;
pub mod error;
pub mod sse;

pub use api::ChatApiClient;
pub use error::ClientError;
pub use sse::{SseFrameDecoder, TurnEventStream};
