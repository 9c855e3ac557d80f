use std::collections::HashSet;
use std::sync::Arc;

use tsumugi_core::{ContextMessage, InboundMessage, MessageLookup};

/// Gathers the prior messages a reply should be grounded on.
pub struct ContextCollector {
    lookup: Arc<dyn MessageLookup>,
}

impl ContextCollector {
    pub fn new(lookup: Arc<dyn MessageLookup>) -> Self {
        Self { lookup }
    }

    /// Referenced message plus up to `limit` thread messages, oldest first.
    ///
    /// A failing source contributes nothing; this never errors.
    pub async fn collect(&self, target: &InboundMessage, limit: usize) -> Vec<ContextMessage> {
        let mut seen: HashSet<u64> = HashSet::from([target.id]);
        let mut context: Vec<ContextMessage> = Vec::new();

        if let Some(reply_id) = target.reply_target_id {
            match self.lookup.fetch_message(target.channel_id, reply_id).await {
                Ok(Some(referenced)) => {
                    if referenced.is_user_message() && seen.insert(referenced.id) {
                        context.push(ContextMessage::from(&referenced));
                    }
                }
                Ok(None) => {
                    tracing::warn!(
                        channel_id = target.channel_id,
                        message_id = reply_id,
                        "Referenced message could not be resolved"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        channel_id = target.channel_id,
                        message_id = reply_id,
                        "Failed to fetch referenced message: {e}"
                    );
                }
            }
        }

        if let Some(thread_id) = target.thread_id.filter(|_| limit > 0) {
            match self.lookup.fetch_thread_history(thread_id, limit).await {
                Ok(history) => {
                    // the lookup may hand back more than asked for; keep the newest
                    let mut history: Vec<InboundMessage> = history
                        .into_iter()
                        .filter(|m| m.is_user_message() && m.id != target.id)
                        .collect();
                    history.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                    history.truncate(limit);
                    for msg in &history {
                        if seen.insert(msg.id) {
                            context.push(ContextMessage::from(msg));
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(thread_id, "Failed to fetch thread history: {e}");
                }
            }
        }

        context.sort_by_key(|m| m.timestamp);
        context
    }
}
