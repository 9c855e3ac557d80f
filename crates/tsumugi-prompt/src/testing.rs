use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tsumugi_core::{
    GenerationBackend, GenerationParams, GenerationResult, InboundMessage, MessageKind,
    MessageLookup, Result, TsumugiError,
};

pub const CHANNEL_ID: u64 = 500;
pub const BOT_ID: u64 = 9000;

/// A user message whose timestamp is `secs` after the epoch.
pub fn message(id: u64, content: &str, secs: i64) -> InboundMessage {
    InboundMessage {
        id,
        author_id: 1000 + id,
        author_name: format!("user{id}"),
        is_bot_author: false,
        kind: MessageKind::User,
        content: content.to_string(),
        timestamp: DateTime::<Utc>::from_timestamp(secs, 0).unwrap(),
        channel_id: CHANNEL_ID,
        mentioned_user_ids: HashSet::from([BOT_ID]),
        reply_target_id: None,
        thread_id: None,
    }
}

#[derive(Default)]
pub struct FakeLookup {
    messages: HashMap<u64, InboundMessage>,
    thread: Vec<InboundMessage>,
    fail: bool,
    message_calls: AtomicUsize,
    thread_calls: AtomicUsize,
}

impl FakeLookup {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_message(mut self, msg: InboundMessage) -> Self {
        self.messages.insert(msg.id, msg);
        self
    }

    pub fn with_thread(mut self, thread: Vec<InboundMessage>) -> Self {
        self.thread = thread;
        self
    }

    pub fn message_calls(&self) -> usize {
        self.message_calls.load(Ordering::SeqCst)
    }

    pub fn thread_calls(&self) -> usize {
        self.thread_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageLookup for FakeLookup {
    async fn fetch_message(&self, _channel_id: u64, message_id: u64)
        -> Result<Option<InboundMessage>> {
        self.message_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TsumugiError::ContextLookupFailure("missing permissions".into()));
        }
        Ok(self.messages.get(&message_id).cloned())
    }

    async fn fetch_thread_history(&self, _thread_id: u64, _limit: usize)
        -> Result<Vec<InboundMessage>> {
        self.thread_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(TsumugiError::ContextLookupFailure("network down".into()));
        }
        Ok(self.thread.clone())
    }
}

/// Replays a fixed result and records every prompt it receives.
pub struct ScriptedBackend {
    result: GenerationResult,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(result: GenerationResult) -> Self {
        Self {
            result,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> GenerationResult {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.result.clone()
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}
