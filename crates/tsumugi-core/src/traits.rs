use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GenerationParams, GenerationResult, InboundMessage};

/// Read access to the platform's message graph.
#[async_trait]
pub trait MessageLookup: Send + Sync {
    /// Returns `Ok(None)` when the message is gone or not visible to the bot.
    async fn fetch_message(&self, channel_id: u64, message_id: u64)
        -> Result<Option<InboundMessage>>;

    /// Up to `limit` most recent messages of a thread, in any order.
    async fn fetch_thread_history(&self, thread_id: u64, limit: usize)
        -> Result<Vec<InboundMessage>>;
}

#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send_message(&self, channel_id: u64, text: &str) -> Result<()>;
}

/// A generative model reachable with one call per prompt.
///
/// Implementations never return an error: every failure is folded into
/// [`GenerationResult::Failure`] so a broken backend cannot take down the
/// message loop.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> GenerationResult;

    fn model_id(&self) -> &str;
}

/// Turns a message into reply text; an empty string means "do not reply".
#[async_trait]
pub trait Responder: Send + Sync {
    async fn get_response(&self, target: &InboundMessage) -> String;
}
