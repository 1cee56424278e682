//! # Response Generator
//!
//! Produces assistant replies. The chat layer only depends on the
//! [`ResponseGenerator`] trait; [`SimpleChatbot`] is the built-in implementation.

use async_trait::async_trait;
use lib_core::model::store::Message;
use lib_core::Result;
use rand::seq::SliceRandom;

/// Turns an incoming message plus the thread transcript into reply text.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// `history` is the full thread in commit order, including `content` itself.
    async fn generate(&self, content: &str, history: &[Message]) -> Result<String>;
}

const CANNED_RESPONSES: &[&str] = &[
    "I understand your concern. Let me help you with that.",
    "That's an interesting question. Here's what I think...",
    "I can help you with that. Let me explain...",
    "Thank you for sharing. Here's my response...",
    "I see what you mean. Let me address that...",
    "That's a good question. Here's what you should know...",
    "I understand. Here's what I recommend...",
    "Let me help you with that information...",
    "I can provide guidance on that topic...",
    "Here's what you need to know about that...",
];

/// Picks a canned reply uniformly at random.
#[derive(Debug, Clone, Default)]
pub struct SimpleChatbot;

impl SimpleChatbot {
    pub fn new() -> Self {
        Self
    }

    fn pick(&self) -> &'static str {
        CANNED_RESPONSES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(CANNED_RESPONSES[0])
    }
}

#[async_trait]
impl ResponseGenerator for SimpleChatbot {
    async fn generate(&self, content: &str, history: &[Message]) -> Result<String> {
        tracing::debug!(content_len = content.len(), history_len = history.len(), "Generating canned reply");
        Ok(self.pick().to_string())
    }
}
