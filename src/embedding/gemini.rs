//! Google Gemini embeddings provider.
//!
//! Gemini's `embedContent` takes one input per request, so batches use the
//! sequential default of [`EmbeddingProvider::batch_embed`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use super::traits::{prepare_input, EmbeddingError, EmbeddingProvider, EmbeddingResult};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";
const DEFAULT_MODEL: &str = "text-embedding-004";
const MAX_INPUT_CHARS: usize = 10_000;
const DIMENSION: usize = 768;

/// Maps a configured model onto a Gemini embedding model.
///
/// Empty or OpenAI-specific names fall back to the default.
fn gemini_model(model: &str) -> String {
    match model.trim() {
        "" | "text-embedding-ada-002" => DEFAULT_MODEL.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Serialize)]
struct EmbedContentRequest<'a> {
    content: Content<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Embeddings over the Gemini `models/{model}:embedContent` endpoint.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(api_key: impl Into<String>, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: GEMINI_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: gemini_model(model),
        }
    }

    /// Overrides the API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> EmbeddingResult<Url> {
        let mut url = Url::parse(&format!("{}/models/{}:embedContent", self.base_url, self.model))
            .map_err(|e| EmbeddingError::ProviderUnavailable(format!("invalid endpoint: {}", e)))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    fn name(&self) -> &str {
        "gemini"
    }

    fn dimension(&self) -> usize {
        DIMENSION
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if self.api_key.trim().is_empty() {
            return Err(EmbeddingError::ProviderUnavailable(
                "Gemini API key not configured".to_string(),
            ));
        }
        let text = prepare_input(text, MAX_INPUT_CHARS)?;

        let body = EmbedContentRequest {
            content: Content {
                parts: [Part { text: &text }],
            },
        };

        let response = self.client.post(self.endpoint()?).json(&body).send().await?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = match response.json::<GeminiError>().await {
                Ok(error) => error.error.message,
                Err(_) => format!("HTTP {}", status),
            };
            return Err(EmbeddingError::Upstream {
                status: Some(status),
                message,
            });
        }

        let parsed: EmbedContentResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        Ok(parsed.embedding.values)
    }
}
