use thiserror::Error;

#[derive(Debug, Error)]
pub enum TsumugiError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Backend init failure: {0}")]
    BackendInitFailure(String),

    #[error("Context lookup failure: {0}")]
    ContextLookupFailure(String),

    #[error("Generation failure: {0}")]
    GenerationFailure(String),

    #[error("Send failure: {0}")]
    SendFailure(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TsumugiError>;
