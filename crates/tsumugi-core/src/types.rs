use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TsumugiError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageKind {
    /// A regular message typed by a user (including inline replies).
    User,
    /// Joins, pins, boosts and other platform-generated messages.
    System,
}

/// Snapshot of a chat message at the moment it is handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub is_bot_author: bool,
    pub kind: MessageKind,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub channel_id: u64,
    pub mentioned_user_ids: HashSet<u64>,
    pub reply_target_id: Option<u64>,
    pub thread_id: Option<u64>,
}

impl InboundMessage {
    pub fn mentions(&self, user_id: u64) -> bool {
        self.mentioned_user_ids.contains(&user_id)
    }

    pub fn is_user_message(&self) -> bool {
        self.kind == MessageKind::User
    }
}

/// The part of a prior message that ends up in a prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContextMessage {
    pub id: u64,
    pub author_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&InboundMessage> for ContextMessage {
    fn from(msg: &InboundMessage) -> Self {
        Self {
            id: msg.id,
            author_name: msg.author_name.clone(),
            content: msg.content.clone(),
            timestamp: msg.timestamp,
        }
    }
}

/// Sampling controls sent with every generation request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 1000,
            top_p: 0.8,
            top_k: 40,
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(TsumugiError::ConfigError(format!(
                "generation.temperature must be within [0, 2], got {}",
                self.temperature
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(TsumugiError::ConfigError(
                "generation.max_output_tokens must be greater than 0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(TsumugiError::ConfigError(format!(
                "generation.top_p must be within [0, 1], got {}",
                self.top_p
            )));
        }
        if self.top_k == 0 {
            return Err(TsumugiError::ConfigError(
                "generation.top_k must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a single generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResult {
    /// Non-empty, trimmed text.
    Text(String),
    /// The backend answered but produced nothing usable.
    Empty,
    /// Transport, status or parse error.
    Failure(String),
}

impl GenerationResult {
    /// Wraps raw text, collapsing whitespace-only output into `Empty`.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Text(trimmed.to_string())
        }
    }
}
