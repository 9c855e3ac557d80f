use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TsumugiError};
use crate::types::GenerationParams;

pub const DEFAULT_PERSONA: &str = "You are a helpful and friendly Discord bot.";
pub const DEFAULT_STYLE: &str = "Respond in a concise and engaging way.";
pub const DEFAULT_CONSTRAINTS: &str = "Keep your response under 200 characters.";
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Value shipped in sample configs; treated the same as a missing token.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_DISCORD_BOT_TOKEN_HERE";

/// Discord's hard limit on message length.
const DISCORD_MESSAGE_LIMIT: usize = 2000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub gemini: GeminiConfig,
    pub prompt: PromptConfig,
    pub generation: GenerationParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub token: String,
    /// Channels the bot answers in. Empty means every channel.
    pub allowed_channels: Vec<u64>,
    pub max_reply_chars: usize,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            allowed_channels: Vec::new(),
            max_reply_chars: DISCORD_MESSAGE_LIMIT,
        }
    }
}

impl DiscordConfig {
    /// The bot cannot run at all without a real token.
    pub fn validated_token(&self) -> Result<&str> {
        let token = self.token.trim();
        if token.is_empty() || token == PLACEHOLDER_TOKEN {
            return Err(TsumugiError::ConfigError(
                "Discord bot token is missing or still the placeholder value".into(),
            ));
        }
        Ok(token)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model_id: Option<String>,
    pub api_base: String,
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_id: None,
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    /// `(api_key, model_id)` when both are present and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let api_key = non_blank(self.api_key.as_deref())?;
        let model_id = non_blank(self.model_id.as_deref())?;
        Some((api_key, model_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub persona: String,
    pub style: String,
    pub constraints: String,
    pub max_context_messages: usize,
    pub include_usernames: bool,
    pub include_timestamps: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            style: DEFAULT_STYLE.to_string(),
            constraints: DEFAULT_CONSTRAINTS.to_string(),
            max_context_messages: 5,
            include_usernames: true,
            include_timestamps: false,
        }
    }
}

impl PromptConfig {
    pub fn persona(&self) -> &str {
        non_blank(Some(self.persona.as_str())).unwrap_or(DEFAULT_PERSONA)
    }

    pub fn style(&self) -> &str {
        non_blank(Some(self.style.as_str())).unwrap_or(DEFAULT_STYLE)
    }

    pub fn constraints(&self) -> &str {
        non_blank(Some(self.constraints.as_str())).unwrap_or(DEFAULT_CONSTRAINTS)
    }
}

impl AppConfig {
    /// Secrets are usually supplied through the environment rather than the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("DISCORD_BOT_TOKEN") {
            self.discord.token = token;
        }
        if let Some(api_key) = lookup("GEMINI_API_KEY") {
            self.gemini.api_key = Some(api_key);
        }
        if let Some(model_id) = lookup("GEMINI_MODEL_ID") {
            self.gemini.model_id = Some(model_id);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.generation.validate()?;
        if self.discord.max_reply_chars == 0 {
            return Err(TsumugiError::ConfigError(
                "discord.max_reply_chars must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        TsumugiError::ConfigError(format!("Failed to read config {}: {e}", path.display()))
    })?;
    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        TsumugiError::ConfigError(format!("Failed to parse config {}: {e}", path.display()))
    })?;
    config.validate()?;
    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
