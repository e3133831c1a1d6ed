//! Gemini provider implementation.
//!
//! This module provides a client for the Gemini REST API that implements the
//! Provider trait. Embeddings use `embedContent` / `batchEmbedContents`,
//! generation uses `generateContent`.

use super::types::*;
use crate::config::{Config, ConfigError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Largest number of texts the backend accepts in one batch embedding call.
const MAX_BATCH_SIZE: usize = 100;

const API_VERSION: &str = "v1beta";

/// Gemini HTTP API provider.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    http_client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
}

impl GeminiProvider {
    /// Creates a new Gemini provider from the startup configuration.
    ///
    /// Fails if no API key is configured, so a misconfigured process stops
    /// before serving any query.
    pub fn new(config: &Config) -> std::result::Result<Self, ConfigError> {
        let api_key = config.api_key()?.to_string();

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm.request_timeout_secs))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            api_key,
            http_client,
            max_retries: config.llm.max_retries,
            backoff: Duration::from_millis(250),
        })
    }

    /// Overrides the initial retry delay. Each retry doubles it.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/{}/models/{}:{}",
            self.base_url,
            API_VERSION,
            model.trim_start_matches("models/"),
            method
        )
    }

    /// POSTs `body` and decodes the response, retrying transient failures.
    ///
    /// All calls made through here are pure functions of their input, so
    /// repeating them is safe.
    async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let mut attempt = 0;
        loop {
            match self.post_once(url, body).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    let delay = self.backoff * 2u32.saturating_pow(attempt);
                    warn!(url = %url, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %e, "Retrying backend request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn generate_content(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let url = self.model_url(&request.model, "generateContent");
        debug!(model = %request.model, prompt_len = request.prompt.len(), "Calling generateContent");

        let body = GeminiGenerateRequest {
            contents: vec![Content::user_text(request.prompt)],
            generation_config: request
                .temperature
                .map(|temperature| GenerationConfig { temperature: Some(temperature) }),
        };

        self.post_json(&url, &body).await
    }

    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        let url = self.model_url(model, "embedContent");
        let body = EmbedContentRequest::new(model, text);

        let response: EmbedContentResponse = self.post_json(&url, &body).await?;
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str], model: &str) -> Result<Vec<Vec<f32>>> {
        let url = self.model_url(model, "batchEmbedContents");
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH_SIZE) {
            debug!(model = %model, batch_len = batch.len(), "Calling batchEmbedContents");
            let body = BatchEmbedContentsRequest {
                requests: batch
                    .iter()
                    .map(|text| EmbedContentRequest::new(model, text))
                    .collect(),
            };

            let response: BatchEmbedContentsResponse = self.post_json(&url, &body).await?;
            if response.embeddings.len() != batch.len() {
                return Err(ProviderError::Malformed(format!(
                    "requested {} embeddings, received {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(embeddings)
    }
}

// Gemini-specific request/response types (internal)

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
}

impl EmbedContentRequest {
    fn new(model: &str, text: &str) -> Self {
        Self {
            model: format!("models/{}", model.trim_start_matches("models/")),
            content: Content::plain(text),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Clone, Serialize)]
struct BatchEmbedContentsRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Clone, Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> Config {
        let mut config = Config::default();
        config.llm.api_key = Some("test-key".to_string());
        config.llm.base_url = "https://example.test/".to_string();
        config
    }

    #[test]
    fn test_requires_api_key() {
        let err = GeminiProvider::new(&Config::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn test_model_url() {
        let provider = GeminiProvider::new(&config_with_key()).unwrap();
        assert_eq!(
            provider.model_url("gemini-2.5-flash", "generateContent"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            provider.model_url("models/gemini-embedding-001", "embedContent"),
            "https://example.test/v1beta/models/gemini-embedding-001:embedContent"
        );
    }

    #[test]
    fn test_generate_request_wire_format() {
        let body = GeminiGenerateRequest {
            contents: vec![Content::user_text("hello")],
            generation_config: Some(GenerationConfig { temperature: Some(0.5) }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_embed_request_wire_format() {
        let json = serde_json::to_value(EmbedContentRequest::new("gemini-embedding-001", "refund")).unwrap();
        assert_eq!(json["model"], "models/gemini-embedding-001");
        assert_eq!(json["content"]["parts"][0]["text"], "refund");
        assert!(json["content"].get("role").is_none());
    }

    #[test]
    fn test_embed_responses_decode() {
        let single: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding": {"values": [0.1, 0.2]}}"#).unwrap();
        assert_eq!(single.embedding.values, vec![0.1, 0.2]);

        let batch: BatchEmbedContentsResponse =
            serde_json::from_str(r#"{"embeddings": [{"values": [1.0]}, {"values": [2.0]}]}"#).unwrap();
        assert_eq!(batch.embeddings.len(), 2);
    }

    #[test]
    fn test_api_error_envelope() {
        let envelope: ApiErrorEnvelope = serde_json::from_str(
            r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#,
        )
        .unwrap();
        assert_eq!(envelope.error.message, "Resource has been exhausted");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_provider_error() {
        let mut config = config_with_key();
        config.llm.base_url = "http://127.0.0.1:9".to_string();
        config.llm.max_retries = 1;
        config.llm.request_timeout_secs = 2;
        let provider = GeminiProvider::new(&config)
            .unwrap()
            .with_backoff(Duration::from_millis(1));

        let err = provider
            .generate_content(GenerateRequest::new("gemini-2.5-flash", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
    }
}
