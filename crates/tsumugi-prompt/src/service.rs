use std::sync::Arc;

use async_trait::async_trait;
use tsumugi_core::{
    AppConfig, GenerationBackend, GenerationParams, GenerationResult, InboundMessage,
    MessageLookup, PromptConfig, Responder, TsumugiError,
};
use tsumugi_inference::GeminiClient;

use crate::builder::PromptBuilder;
use crate::context::ContextCollector;

/// Collects context, builds the prompt, calls the model and validates the reply.
///
/// Whether a backend exists is decided once in the constructor. Without one
/// the service stays non-operational for the life of the process and every
/// call returns an empty string.
pub struct ResponseService {
    backend: Option<Arc<dyn GenerationBackend>>,
    collector: ContextCollector,
    prompt: PromptConfig,
    params: GenerationParams,
}

impl ResponseService {
    pub fn new(
        backend: Option<Arc<dyn GenerationBackend>>,
        lookup: Arc<dyn MessageLookup>,
        prompt: PromptConfig,
        params: GenerationParams,
    ) -> Self {
        Self {
            backend,
            collector: ContextCollector::new(lookup),
            prompt,
            params,
        }
    }

    /// Builds the Gemini client from configuration. Missing credentials or a
    /// client that fails to build leave the service non-operational.
    pub fn from_config(config: &AppConfig, lookup: Arc<dyn MessageLookup>) -> Self {
        let backend: Option<Arc<dyn GenerationBackend>> = match GeminiClient::new(&config.gemini) {
            Ok(client) => {
                tracing::info!(
                    model = client.model_id(),
                    "Gemini client initialized. Bot responses enabled."
                );
                Some(Arc::new(client) as Arc<dyn GenerationBackend>)
            }
            Err(TsumugiError::ConfigurationMissing(what)) => {
                tracing::warn!(
                    "Gemini settings ({what}) are missing or incomplete. Bot responses will be disabled."
                );
                None
            }
            Err(e) => {
                tracing::error!(
                    model = config.gemini.model_id.as_deref().unwrap_or_default(),
                    "Failed to initialize Gemini client: {e}. Bot responses will be disabled."
                );
                None
            }
        };
        Self::new(backend, lookup, config.prompt.clone(), config.generation)
    }

    pub fn is_operational(&self) -> bool {
        self.backend.is_some()
    }
}

#[async_trait]
impl Responder for ResponseService {
    async fn get_response(&self, target: &InboundMessage) -> String {
        let Some(backend) = &self.backend else {
            tracing::warn!(
                "Bot response skipped: generation backend is not operational (check configuration and startup logs)"
            );
            return String::new();
        };

        let context = self
            .collector
            .collect(target, self.prompt.max_context_messages)
            .await;
        let prompt = PromptBuilder::build(target, &context, &self.prompt);
        tracing::debug!(message_id = target.id, context = context.len(), %prompt, "Built prompt");

        match backend.generate(&prompt, &self.params).await {
            GenerationResult::Text(text) => {
                // backends are expected to trim, but a stray blank must never reach the channel
                let text = text.trim();
                if text.is_empty() {
                    tracing::warn!(model = backend.model_id(), "Backend returned blank text");
                    return String::new();
                }
                tracing::debug!(model = backend.model_id(), response = text, "Received response");
                text.to_string()
            }
            GenerationResult::Empty => {
                tracing::warn!(
                    model = backend.model_id(),
                    message_id = target.id,
                    "Backend returned no usable content"
                );
                String::new()
            }
            GenerationResult::Failure(reason) => {
                tracing::error!(
                    model = backend.model_id(),
                    message_id = target.id,
                    "Generation failed: {reason}"
                );
                String::new()
            }
        }
    }
}
