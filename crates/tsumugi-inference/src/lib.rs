use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tsumugi_core::{
    GeminiConfig, GenerationBackend, GenerationParams, GenerationResult, Result, TsumugiError,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

impl From<&GenerationParams> for GenerationConfig {
    fn from(params: &GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            max_output_tokens: params.max_output_tokens,
            top_p: params.top_p,
            top_k: params.top_k,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// Client for the Gemini `generateContent` endpoint.
///
/// Holds a pooled [`reqwest::Client`]; one instance serves every handler.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let (api_key, model) = config.credentials().ok_or_else(|| {
            TsumugiError::ConfigurationMissing("gemini.api_key and gemini.model_id".into())
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| TsumugiError::BackendInitFailure(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    async fn generate_content(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> std::result::Result<GenerateContentResponse, String> {
        let req = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: params.into(),
        };
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Gemini request");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| format!("HTTP error: {e}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("API error {status}: {body}"));
        }
        resp.json().await.map_err(|e| format!("Parse error: {e}"))
    }
}

/// Joins the non-blank text parts of the first candidate.
fn extract_text(response: &GenerateContentResponse) -> GenerationResult {
    let Some(candidate) = response.candidates.first() else {
        tracing::debug!("Gemini returned no candidates");
        return GenerationResult::Empty;
    };
    let Some(content) = &candidate.content else {
        return GenerationResult::Empty;
    };
    let joined = content
        .parts
        .iter()
        .filter_map(|part| part.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    GenerationResult::from_text(&joined)
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> GenerationResult {
        match self.generate_content(prompt, params).await {
            Ok(response) => extract_text(&response),
            Err(reason) => GenerationResult::Failure(reason),
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/models/gemini-test:generateContent";

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(&GeminiConfig {
            api_key: Some("test-key".into()),
            model_id: Some("gemini-test".into()),
            api_base: server.uri(),
            request_timeout_secs: 5,
        })
        .unwrap()
    }

    async fn respond_with(body: serde_json::Value) -> (MockServer, GeminiClient) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
        let client = client_for(&server);
        (server, client)
    }

    #[test]
    fn new_requires_credentials() {
        let err = GeminiClient::new(&GeminiConfig::default()).err().unwrap();
        assert!(matches!(err, TsumugiError::ConfigurationMissing(_)));
    }

    #[tokio::test]
    async fn sends_prompt_params_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                "generationConfig": { "maxOutputTokens": 1000, "topK": 40 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [{ "text": "hi there" }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.generate("hello", &GenerationParams::default()).await;
        assert_eq!(result, GenerationResult::Text("hi there".into()));
    }

    #[tokio::test]
    async fn joins_trimmed_parts_of_first_candidate() {
        let (_server, client) = respond_with(json!({
            "candidates": [
                { "content": { "parts": [{ "text": " first " }, { "text": "  " }, { "text": "second\n" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .await;

        let result = client.generate("p", &GenerationParams::default()).await;
        assert_eq!(result, GenerationResult::Text("first second".into()));
    }

    #[tokio::test]
    async fn no_candidates_is_empty() {
        let (_server, client) = respond_with(json!({ "candidates": [] })).await;
        let result = client.generate("p", &GenerationParams::default()).await;
        assert_eq!(result, GenerationResult::Empty);
    }

    #[tokio::test]
    async fn candidate_without_content_is_empty() {
        let (_server, client) =
            respond_with(json!({ "candidates": [{ "finishReason": "SAFETY" }] })).await;
        let result = client.generate("p", &GenerationParams::default()).await;
        assert_eq!(result, GenerationResult::Empty);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_empty() {
        let (_server, client) = respond_with(json!({
            "candidates": [{ "content": { "parts": [{ "text": " \n " }] } }]
        }))
        .await;
        let result = client.generate("p", &GenerationParams::default()).await;
        assert_eq!(result, GenerationResult::Empty);
    }

    #[tokio::test]
    async fn server_error_is_failure_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.generate("p", &GenerationParams::default()).await;
        match result {
            GenerationResult::Failure(reason) => assert!(reason.contains("503")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.generate("p", &GenerationParams::default()).await;
        assert!(matches!(result, GenerationResult::Failure(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_failure() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        drop(server);

        let result = client.generate("p", &GenerationParams::default()).await;
        assert!(matches!(result, GenerationResult::Failure(_)));
    }
}
