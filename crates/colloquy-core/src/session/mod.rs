//! Session domain module.
//!
//! # Module Structure
//!
//! - `message`: Conversation message types (`MessageRole`, `Message`,
//!   `MessagePatch`)
//! - `model`: Core session domain model with derived summary fields
//!   (`Session`)
//! - `buffer`: The in-progress assistant message for the active turn
//!   (`StreamingBuffer`)
//! - `store`: The in-memory store holding sessions, the streaming buffer,
//!   and the session-scoped extracted memories (`SessionStore`)

mod buffer;
mod message;
mod model;
mod store;

pub use buffer::StreamingBuffer;
pub use message::{Message, MessagePatch, MessageRole, WELCOME_ID_PREFIX};
pub use model::Session;
pub use store::SessionStore;
