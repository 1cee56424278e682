//! # Chat State
//!
//! Shared state for live chat sessions: the message store, the response
//! generator, the connection registry (through the broadcast coordinator)
//! and the shutdown signal.

use super::coordinator::BroadcastCoordinator;
use super::registry::ConnectionRegistry;
use super::responder::ResponseGenerator;
use lib_core::model::store::MessageStore;
use lib_core::Config;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-message limits applied by chat sessions.
#[derive(Debug, Clone, Copy)]
pub struct ChatSettings {
    pub max_message_length: usize,
    pub generation_timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ChatSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_message_length: config.max_message_length,
            generation_timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }
}

/// Application state for the chat module
pub struct ChatAppState {
    pub store: Arc<dyn MessageStore>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub coordinator: BroadcastCoordinator,
    pub settings: ChatSettings,
    pub shutdown: CancellationToken,
}

impl ChatAppState {
    pub fn new(store: Arc<dyn MessageStore>, generator: Arc<dyn ResponseGenerator>, settings: ChatSettings) -> Self {
        Self {
            store,
            generator,
            coordinator: BroadcastCoordinator::new(ConnectionRegistry::new(), settings.generation_timeout),
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        self.coordinator.registry()
    }
}
