//! Text embeddings for semantic search.
//!
//! - [`EmbeddingProvider`] - trait over remote embedding APIs
//! - [`OpenAiEmbedder`] - OpenAI `/embeddings`, native batching
//! - [`GeminiEmbedder`] - Gemini `embedContent`, one input per call
//! - [`cosine_similarity`] - ranking metric for stored vectors

mod gemini;
mod openai;
mod traits;

use std::sync::Arc;

pub use gemini::GeminiEmbedder;
pub use openai::OpenAiEmbedder;
pub use traits::{cosine_similarity, EmbeddingError, EmbeddingProvider, EmbeddingResult};

use crate::config::{EmbeddingProviderKind, EmbeddingSettings};

/// Builds the configured embedding provider.
///
/// A missing API key still yields a provider; its calls fail with
/// [`EmbeddingError::ProviderUnavailable`].
pub fn from_settings(settings: &EmbeddingSettings) -> Arc<dyn EmbeddingProvider> {
    match settings.provider {
        EmbeddingProviderKind::OpenAi => {
            let mut embedder = OpenAiEmbedder::new(settings.api_key.clone(), settings.model.clone());
            if let Some(base_url) = &settings.base_url {
                embedder = embedder.with_base_url(base_url.clone());
            }
            Arc::new(embedder)
        }
        EmbeddingProviderKind::Gemini => {
            let mut embedder = GeminiEmbedder::new(settings.api_key.clone(), &settings.model);
            if let Some(base_url) = &settings.base_url {
                embedder = embedder.with_base_url(base_url.clone());
            }
            Arc::new(embedder)
        }
    }
}
