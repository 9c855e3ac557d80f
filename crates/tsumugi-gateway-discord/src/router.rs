use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tsumugi_core::{InboundMessage, ReplySink, Responder};

/// Decides whether an inbound message gets a reply and delivers it.
pub struct MessageRouter {
    responder: Arc<dyn Responder>,
    // 0 until the gateway reports ready
    bot_user_id: AtomicU64,
    allowed_channels: Vec<u64>,
    max_reply_chars: usize,
}

impl MessageRouter {
    pub fn new(responder: Arc<dyn Responder>, allowed_channels: Vec<u64>, max_reply_chars: usize) -> Self {
        Self {
            responder,
            bot_user_id: AtomicU64::new(0),
            allowed_channels,
            max_reply_chars,
        }
    }

    pub fn set_bot_user_id(&self, id: u64) {
        self.bot_user_id.store(id, Ordering::Relaxed);
    }

    pub fn bot_user_id(&self) -> Option<u64> {
        match self.bot_user_id.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    /// Cheap checks that need no I/O. Adapters may call this to skip work
    /// before building a full [`InboundMessage`].
    pub fn should_respond(&self, message: &InboundMessage) -> bool {
        if !message.is_user_message() || message.is_bot_author {
            return false;
        }
        if !self.allowed_channels.is_empty() && !self.allowed_channels.contains(&message.channel_id) {
            return false;
        }
        self.bot_user_id().is_some_and(|id| message.mentions(id))
    }

    /// Never fails: a response or delivery problem only ends up in the logs.
    pub async fn handle(&self, message: &InboundMessage, sink: &dyn ReplySink) {
        if !self.should_respond(message) {
            return;
        }
        tracing::debug!(message_id = message.id, channel_id = message.channel_id, "Bot mentioned");

        let response = self.responder.get_response(message).await;
        let response = response.trim();
        if response.is_empty() {
            return;
        }
        let reply = truncate_chars(response, self.max_reply_chars);

        match sink.send_message(message.channel_id, reply).await {
            Ok(()) => {
                tracing::info!(channel_id = message.channel_id, "Sent response");
            }
            Err(e) => {
                tracing::error!(
                    channel_id = message.channel_id,
                    "Failed to send response: {e}"
                );
            }
        }
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => {
            tracing::warn!(max_chars, "Response exceeds the message limit, truncating");
            &text[..end]
        }
        None => text,
    }
}
