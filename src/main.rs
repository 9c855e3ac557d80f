use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tsumugi_core::load_config;
use tsumugi_gateway_discord::{start_discord_bot, DiscordApi, MessageRouter};
use tsumugi_prompt::ResponseService;

const DEFAULT_CONFIG_PATH: &str = "tsumugi.toml";

fn config_path() -> PathBuf {
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TSUMUGI_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
        .into()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    tracing::info!(
        "Tsumugi {} (commit {}) starting...",
        env!("CARGO_PKG_VERSION"),
        option_env!("TSUMUGI_GIT_COMMIT").unwrap_or("unknown")
    );

    let path = config_path();
    let mut config = load_config(&path)?;
    config.apply_env_overrides();

    let token = match config.discord.validated_token() {
        Ok(token) => token.to_string(),
        Err(e) => {
            tracing::error!("{e}. Please update the configuration. Bot will not start.");
            return Err(e.into());
        }
    };

    let api = Arc::new(DiscordApi::new(&token));
    let responder = Arc::new(ResponseService::from_config(&config, api.clone()));
    let router = Arc::new(MessageRouter::new(
        responder,
        config.discord.allowed_channels.clone(),
        config.discord.max_reply_chars,
    ));

    start_discord_bot(&token, router, api).await?;
    tracing::info!("Shutting down...");
    Ok(())
}
