pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{load_config, AppConfig, DiscordConfig, GeminiConfig, PromptConfig};
pub use error::{Result, TsumugiError};
pub use traits::{GenerationBackend, MessageLookup, ReplySink, Responder};
pub use types::{
    ContextMessage, GenerationParams, GenerationResult, InboundMessage, MessageKind,
};
