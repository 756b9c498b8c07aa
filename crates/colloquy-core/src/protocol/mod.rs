//! The turn-stream wire protocol.
//!
//! # Module Structure
//!
//! - `event`: event kinds and loosely-typed payloads (`TurnEvent`,
//!   `WireMessage`, `WireMemory`, `WireSummary`)
//! - `normalize`: the single place that resolves the backend's dual
//!   snake/camel field casings

mod event;
pub mod normalize;

pub use event::{EventKind, TurnEvent, WireMemory, WireMessage, WireSummary};
