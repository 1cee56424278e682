//! # Broadcast Coordinator
//!
//! Sequences persistence before visibility: a message is handed to the
//! [`ConnectionRegistry`] only after the store has returned it. If the write
//! fails nothing is broadcast and the error goes back to the caller.

use super::envelope::Envelope;
use super::registry::ConnectionRegistry;
use super::responder::ResponseGenerator;
use lib_core::model::store::{Message, Role, StoreSession};
use lib_core::{AppError, Result};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Stage at which producing an assistant reply failed.
#[derive(Debug)]
pub enum ReplyError {
    /// Reading the thread transcript failed.
    History(AppError),
    /// The generator failed or timed out.
    Generation(AppError),
    /// Persisting the generated reply failed.
    Persist(AppError),
}

impl ReplyError {
    /// Message shown to the sender in the `error` envelope.
    pub fn client_message(&self) -> &'static str {
        match self {
            ReplyError::History(_) => "Failed to load conversation history",
            ReplyError::Generation(_) => "Failed to generate response",
            ReplyError::Persist(_) => "Failed to save response",
        }
    }

    pub fn source(&self) -> &AppError {
        match self {
            ReplyError::History(e) | ReplyError::Generation(e) | ReplyError::Persist(e) => e,
        }
    }
}

#[derive(Clone)]
pub struct BroadcastCoordinator {
    registry: ConnectionRegistry,
    generation_timeout: Duration,
}

impl BroadcastCoordinator {
    pub fn new(registry: ConnectionRegistry, generation_timeout: Duration) -> Self {
        Self {
            registry,
            generation_timeout,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Persist a message, then broadcast it to every connection on the thread.
    #[instrument(skip(self, store, content), fields(content_len = content.len()))]
    pub async fn publish(
        &self,
        store: &mut dyn StoreSession,
        thread_id: i64,
        role: Role,
        content: &str,
    ) -> Result<Message> {
        let message = store.create_message(content, role, thread_id).await?;

        let delivered = self.registry.broadcast(thread_id, &Envelope::message(&message));
        info!(
            thread_id,
            message_id = message.id,
            role = %role,
            delivered,
            "Message persisted and broadcast"
        );

        Ok(message)
    }

    /// Generate the assistant reply for `content` and publish it.
    ///
    /// History is read after the user message has been stored, so the
    /// generator sees it as the last entry.
    #[instrument(skip(self, store, generator, content))]
    pub async fn reply(
        &self,
        store: &mut dyn StoreSession,
        generator: &dyn ResponseGenerator,
        thread_id: i64,
        content: &str,
    ) -> std::result::Result<Message, ReplyError> {
        let history = store
            .get_thread_messages(thread_id)
            .await
            .map_err(ReplyError::History)?;

        let text = match tokio::time::timeout(self.generation_timeout, generator.generate(content, &history)).await {
            Ok(Ok(text)) => text,
            Ok(Err(e @ AppError::Generation(_))) => return Err(ReplyError::Generation(e)),
            Ok(Err(e)) => return Err(ReplyError::Generation(AppError::Generation(e.to_string()))),
            Err(_) => {
                warn!(thread_id, timeout_secs = self.generation_timeout.as_secs(), "Response generation timed out");
                return Err(ReplyError::Generation(AppError::Generation(format!(
                    "no reply within {}s",
                    self.generation_timeout.as_secs()
                ))));
            }
        };

        if text.trim().is_empty() {
            return Err(ReplyError::Generation(AppError::Generation(
                "generator returned an empty reply".to_string(),
            )));
        }

        self.publish(store, thread_id, Role::Assistant, &text)
            .await
            .map_err(ReplyError::Persist)
    }
}

// endregion: --- Tests
