//! The stream driver: owns the lifecycle of one streaming turn.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::RwLock;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::interpreter::{self, Disposition};
use crate::memory::ExtractedMemory;
use crate::session::{Message, Session, SessionStore, StreamingBuffer};
use crate::transport::{EventStream, TurnTransport};

/// How a turn reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A terminal event ended the turn.
    Completed,
    /// The transport closed (or stalled) without a terminal event and the
    /// fallback timer flushed whatever had accumulated.
    FlushedByTimer,
}

/// Drives turns against a [`TurnTransport`] and keeps the [`SessionStore`]
/// consistent under session switching and partial failures.
///
/// One turn streams at a time; events are always applied to the session id
/// captured at turn start, so switching the displayed session mid-stream
/// never cross-contaminates message lists.
pub struct SessionEngine {
    store: Arc<RwLock<SessionStore>>,
    transport: Arc<dyn TurnTransport>,
    config: EngineConfig,
}

impl SessionEngine {
    pub fn new(transport: Arc<dyn TurnTransport>, config: EngineConfig) -> Self {
        let store = SessionStore::new(config.welcome_message.clone());
        Self {
            store: Arc::new(RwLock::new(store)),
            transport,
            config,
        }
    }

    /// Submits a user turn and drives it to a terminal state exactly once.
    ///
    /// The user message is appended immediately (optimistic, always succeeds
    /// locally) before the channel opens. On any failure path the partial
    /// assistant content is flushed into the session first, so user-visible
    /// output is never dropped.
    ///
    /// # Errors
    ///
    /// - [`EngineError::TurnInProgress`] if a turn is already streaming
    /// - [`EngineError::Transport`] if the channel fails to open or closes
    ///   abnormally
    /// - [`EngineError::Turn`] if the stream delivers a genuine protocol
    ///   error event
    pub async fn submit_turn(&self, session_id: &str, text: &str) -> Result<TurnOutcome> {
        {
            let mut store = self.store.write().await;
            if store.is_streaming() {
                return Err(EngineError::turn_in_progress(session_id));
            }
            store.add_message(session_id, Message::user(text));
            store.set_streaming(Some(StreamingBuffer::new(session_id)));
        }

        tracing::debug!("[SessionEngine] Turn started for session {}", session_id);

        let stream = match self.transport.send_turn(session_id, text).await {
            Ok(stream) => stream,
            Err(err) => {
                tracing::warn!("[SessionEngine] Channel open failed: {}", err);
                self.recover_partial(session_id).await;
                return Err(err.into());
            }
        };

        let result = self.drive(session_id, stream).await;

        // Final safety: streaming state is cleared no matter which path
        // reached termination.
        self.store.write().await.set_streaming(None);

        result
    }

    async fn drive(&self, session_id: &str, mut stream: EventStream) -> Result<TurnOutcome> {
        let fallback = tokio::time::sleep(self.config.fallback_flush_delay());
        tokio::pin!(fallback);
        let mut channel_open = true;

        loop {
            tokio::select! {
                event = stream.next(), if channel_open => match event {
                    Some(Ok(event)) => {
                        let disposition = {
                            let mut store = self.store.write().await;
                            interpreter::apply(&mut store, &self.config, session_id, &event)
                        };
                        match disposition {
                            Disposition::Continue => {}
                            Disposition::Completed => return Ok(TurnOutcome::Completed),
                            Disposition::Failed(notice) => {
                                tracing::warn!(
                                    "[SessionEngine] Turn failed for session {}: {}",
                                    session_id,
                                    notice
                                );
                                return Err(EngineError::turn(notice));
                            }
                        }
                    }
                    Some(Err(err)) => {
                        tracing::warn!(
                            "[SessionEngine] Transport failure mid-turn for session {}: {}",
                            session_id,
                            err
                        );
                        self.recover_partial(session_id).await;
                        return Err(err.into());
                    }
                    // Channel closed without a terminal event; the fallback
                    // timer decides when to flush.
                    None => channel_open = false,
                },
                () = &mut fallback => {
                    let flushed = {
                        let mut store = self.store.write().await;
                        interpreter::flush_pending(&mut store, session_id)
                    };
                    tracing::warn!(
                        "[SessionEngine] Fallback flush for session {} (flushed: {})",
                        session_id,
                        flushed
                    );
                    return Ok(TurnOutcome::FlushedByTimer);
                }
            }
        }
    }

    /// Flushes partial content and clears streaming state after a failure.
    async fn recover_partial(&self, session_id: &str) {
        let mut store = self.store.write().await;
        interpreter::flush_pending(&mut store, session_id);
        store.set_streaming(None);
    }

    /// Hydrates a session from the backend's authoritative message list.
    pub async fn hydrate_session(&self, session_id: &str) -> Result<()> {
        let sync = self.transport.fetch_session(session_id).await?;
        let messages = sync.into_messages();
        tracing::debug!(
            "[SessionEngine] Hydrated session {} with {} messages",
            session_id,
            messages.len()
        );
        self.store.write().await.set_messages(session_id, messages);
        Ok(())
    }

    /// Switches the currently displayed session. An in-flight turn is not
    /// cancelled; its events keep applying to its own session.
    pub async fn select_session(&self, session_id: &str) {
        self.store.write().await.select_session(session_id);
    }

    /// Messages of the currently selected session.
    pub async fn current_messages(&self) -> Vec<Message> {
        self.store.read().await.current_messages().to_vec()
    }

    /// The assistant message under construction, if a turn is streaming.
    pub async fn streaming_buffer(&self) -> Option<StreamingBuffer> {
        self.store.read().await.streaming().cloned()
    }

    /// Memories surfaced while the current session has been active.
    pub async fn extracted_memories(&self) -> Vec<ExtractedMemory> {
        self.store.read().await.extracted_memories().to_vec()
    }

    pub async fn is_streaming(&self) -> bool {
        self.store.read().await.is_streaming()
    }

    /// A snapshot of one session's state.
    pub async fn session(&self, session_id: &str) -> Option<Session> {
        self.store.read().await.session(session_id).cloned()
    }
}
