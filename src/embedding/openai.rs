//! OpenAI-compatible embeddings provider.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::traits::{prepare_input, EmbeddingError, EmbeddingProvider, EmbeddingResult};

/// Default base URL for OpenAI API.
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_MODEL: &str = "text-embedding-ada-002";

/// Roughly 8k tokens for the ada/3-series models.
const MAX_INPUT_CHARS: usize = 8000;

/// Vector length for common OpenAI embedding models.
fn model_dimension(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        _ => 1536,
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    One(&'a str),
    Many(&'a [String]),
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI API error response.
#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

/// Embeddings over the OpenAI `/embeddings` endpoint.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    /// Creates a provider for OpenAI's API. An empty model selects the default.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model
        };

        Self {
            client: reqwest::Client::new(),
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: api_key.into(),
            dimension: model_dimension(&model),
            model,
        }
    }

    /// Overrides the API endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the HTTP client (useful for custom timeouts or proxies).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_headers(&self) -> EmbeddingResult<HeaderMap> {
        if self.api_key.trim().is_empty() {
            return Err(EmbeddingError::ProviderUnavailable(
                "OpenAI API key not configured".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| EmbeddingError::ProviderUnavailable(format!("invalid api key: {}", e)))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    async fn request(&self, input: EmbeddingInput<'_>) -> EmbeddingResult<Vec<EmbeddingData>> {
        let headers = self.build_headers()?;
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingRequest {
            model: &self.model,
            input,
        };

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(handle_error_response(response).await);
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(format!("Failed to parse response: {}", e)))?;
        Ok(parsed.data)
    }
}

async fn handle_error_response(response: reqwest::Response) -> EmbeddingError {
    let status = response.status().as_u16();
    let message = match response.json::<OpenAiError>().await {
        Ok(error) => error.error.message,
        Err(_) => format!("HTTP {}", status),
    };
    EmbeddingError::Upstream {
        status: Some(status),
        message,
    }
}

/// Copies a whole-request failure so each carried input can report it.
fn replicate(err: &EmbeddingError) -> EmbeddingError {
    match err {
        EmbeddingError::ProviderUnavailable(m) => EmbeddingError::ProviderUnavailable(m.clone()),
        EmbeddingError::Upstream { status, message } => EmbeddingError::Upstream {
            status: *status,
            message: message.clone(),
        },
        other => EmbeddingError::Upstream {
            status: None,
            message: other.to_string(),
        },
    }
}

/// Places response items by their index. Missing slots become errors.
fn order_by_index(data: Vec<EmbeddingData>, len: usize) -> Vec<EmbeddingResult<Vec<f32>>> {
    let mut slots: Vec<Option<Vec<f32>>> = vec![None; len];
    for item in data {
        if let Some(slot) = slots.get_mut(item.index) {
            *slot = Some(item.embedding);
        }
    }
    slots
        .into_iter()
        .map(|slot| {
            slot.ok_or_else(|| {
                EmbeddingError::InvalidResponse("no embedding data for input".to_string())
            })
        })
        .collect()
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let text = prepare_input(text, MAX_INPUT_CHARS)?;
        let data = self.request(EmbeddingInput::One(&text)).await?;
        data.into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("no embedding data in response".to_string()))
    }

    /// Sends all valid inputs in one request.
    ///
    /// Blank inputs fail individually. If the request fails, every input
    /// it carried reports the failure.
    async fn batch_embed(&self, texts: &[String]) -> Vec<EmbeddingResult<Vec<f32>>> {
        let mut results: Vec<Option<EmbeddingResult<Vec<f32>>>> = Vec::with_capacity(texts.len());
        let mut valid: Vec<String> = Vec::new();
        let mut positions: Vec<usize> = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            match prepare_input(text, MAX_INPUT_CHARS) {
                Ok(clean) => {
                    positions.push(i);
                    valid.push(clean);
                    results.push(None);
                }
                Err(e) => results.push(Some(Err(e))),
            }
        }

        if !valid.is_empty() {
            match self.request(EmbeddingInput::Many(&valid)).await {
                Ok(data) => {
                    for (pos, result) in positions.iter().zip(order_by_index(data, valid.len())) {
                        results[*pos] = Some(result);
                    }
                }
                Err(e) => {
                    for pos in positions {
                        results[pos] = Some(Err(replicate(&e)));
                    }
                }
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(EmbeddingError::InvalidResponse("missing result".to_string()))))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_defaults_and_dimensions() {
        let embedder = OpenAiEmbedder::new("key", "");
        assert_eq!(embedder.model(), "text-embedding-ada-002");
        assert_eq!(embedder.dimension(), 1536);

        let large = OpenAiEmbedder::new("key", "text-embedding-3-large");
        assert_eq!(large.dimension(), 3072);
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let embedder = OpenAiEmbedder::new("", "");
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn blank_text_is_invalid_input() {
        let embedder = OpenAiEmbedder::new("key", "");
        let err = embedder.embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn batch_reports_per_item_failures() {
        // Unconfigured key: the request fails before any network I/O.
        let embedder = OpenAiEmbedder::new("", "");
        let texts = vec!["one".to_string(), " ".to_string(), "two".to_string()];
        let results = embedder.batch_embed(&texts).await;

        assert_eq!(results.len(), 3);
        assert!(matches!(results[0], Err(EmbeddingError::ProviderUnavailable(_))));
        assert!(matches!(results[1], Err(EmbeddingError::InvalidInput(_))));
        assert!(matches!(results[2], Err(EmbeddingError::ProviderUnavailable(_))));
    }

    #[test]
    fn request_body_shapes() {
        let one = serde_json::to_value(EmbeddingRequest {
            model: "m",
            input: EmbeddingInput::One("hi"),
        })
        .unwrap();
        assert_eq!(one, serde_json::json!({"model": "m", "input": "hi"}));

        let texts = vec!["a".to_string(), "b".to_string()];
        let many = serde_json::to_value(EmbeddingRequest {
            model: "m",
            input: EmbeddingInput::Many(&texts),
        })
        .unwrap();
        assert_eq!(many, serde_json::json!({"model": "m", "input": ["a", "b"]}));
    }

    #[test]
    fn response_items_are_ordered_by_index() {
        let data = vec![
            EmbeddingData {
                index: 1,
                embedding: vec![2.0],
            },
            EmbeddingData {
                index: 0,
                embedding: vec![1.0],
            },
        ];
        let ordered = order_by_index(data, 3);
        assert_eq!(ordered[0].as_ref().unwrap(), &vec![1.0]);
        assert_eq!(ordered[1].as_ref().unwrap(), &vec![2.0]);
        assert!(ordered[2].is_err());
    }
}
