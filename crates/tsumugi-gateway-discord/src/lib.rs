pub mod router;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    Channel, ChannelId, Client, Context, EventHandler, GatewayIntents, GetMessages, Http, Message,
    MessageId, MessageType, Ready,
};
use tsumugi_core::{InboundMessage, MessageKind, MessageLookup, ReplySink, Result, TsumugiError};

pub use router::MessageRouter;

/// Discord caps a single history request at 100 messages.
const MAX_HISTORY_PAGE: usize = 100;

/// Milliseconds between the Unix epoch and the Discord epoch (2015-01-01).
const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;

/// REST access used for context lookups and replies.
pub struct DiscordApi {
    http: Arc<Http>,
}

impl DiscordApi {
    pub fn new(token: &str) -> Self {
        Self {
            http: Arc::new(Http::new(token)),
        }
    }
}

#[async_trait]
impl MessageLookup for DiscordApi {
    async fn fetch_message(&self, channel_id: u64, message_id: u64)
        -> Result<Option<InboundMessage>> {
        let msg = ChannelId::new(channel_id)
            .message(&self.http, MessageId::new(message_id))
            .await
            .map_err(|e| TsumugiError::ContextLookupFailure(e.to_string()))?;
        Ok(Some(to_inbound(&msg, None)))
    }

    async fn fetch_thread_history(&self, thread_id: u64, limit: usize)
        -> Result<Vec<InboundMessage>> {
        let page = limit.min(MAX_HISTORY_PAGE) as u8;
        let messages = ChannelId::new(thread_id)
            .messages(&self.http, GetMessages::new().limit(page))
            .await
            .map_err(|e| TsumugiError::ContextLookupFailure(e.to_string()))?;
        Ok(messages
            .iter()
            .map(|m| to_inbound(m, Some(thread_id)))
            .collect())
    }
}

#[async_trait]
impl ReplySink for DiscordApi {
    async fn send_message(&self, channel_id: u64, text: &str) -> Result<()> {
        ChannelId::new(channel_id)
            .say(&self.http, text)
            .await
            .map_err(|e| TsumugiError::SendFailure(e.to_string()))?;
        Ok(())
    }
}

fn to_inbound(msg: &Message, thread_id: Option<u64>) -> InboundMessage {
    let kind = match msg.kind {
        MessageType::Regular | MessageType::InlineReply => MessageKind::User,
        _ => MessageKind::System,
    };
    InboundMessage {
        id: msg.id.get(),
        author_id: msg.author.id.get(),
        author_name: msg
            .author
            .global_name
            .clone()
            .unwrap_or_else(|| msg.author.name.clone()),
        is_bot_author: msg.author.bot,
        kind,
        content: msg.content.clone(),
        timestamp: snowflake_time(msg.id.get()),
        channel_id: msg.channel_id.get(),
        mentioned_user_ids: msg.mentions.iter().map(|u| u.id.get()).collect::<HashSet<_>>(),
        reply_target_id: msg
            .message_reference
            .as_ref()
            .and_then(|r| r.message_id)
            .map(|id| id.get()),
        thread_id,
    }
}

/// Creation time encoded in a snowflake id, millisecond precision.
fn snowflake_time(id: u64) -> DateTime<Utc> {
    let millis = (id >> 22) + DISCORD_EPOCH_MS;
    DateTime::<Utc>::from_timestamp_millis(millis as i64).unwrap_or_default()
}

struct Handler {
    router: Arc<MessageRouter>,
    api: Arc<DiscordApi>,
}

impl Handler {
    async fn resolve_thread(&self, ctx: &Context, msg: &Message) -> Option<u64> {
        match msg.channel(ctx).await {
            Ok(Channel::Guild(channel)) if channel.thread_metadata.is_some() => {
                Some(channel.id.get())
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(channel_id = msg.channel_id.get(), "Failed to resolve channel: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        let mut inbound = to_inbound(&msg, None);
        if !self.router.should_respond(&inbound) {
            return;
        }
        inbound.thread_id = self.resolve_thread(&ctx, &msg).await;
        let _typing = msg.channel_id.start_typing(&ctx.http);
        self.router.handle(&inbound, self.api.as_ref()).await;
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.router.set_bot_user_id(ready.user.id.get());
        tracing::info!("Discord bot connected as {} (id={})", ready.user.name, ready.user.id.get());
    }
}

/// Connects to the gateway and runs until ctrl-c.
pub async fn start_discord_bot(
    token: &str,
    router: Arc<MessageRouter>,
    api: Arc<DiscordApi>,
) -> anyhow::Result<()> {
    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
    let handler = Handler { router, api };
    let mut client = Client::builder(token, intents)
        .event_handler(handler)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stopping Discord bot...");
            shard_manager.shutdown_all().await;
        }
    });

    tracing::info!("Bot connection initiated");
    client.start().await?;
    tracing::info!("Bot stopped");
    Ok(())
}
