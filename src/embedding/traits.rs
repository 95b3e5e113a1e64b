//! Embedding provider trait and vector helpers.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Embedding provider not available: {0}")]
    ProviderUnavailable(String),

    #[error("Upstream error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Upstream { status: Option<u16>, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// A text embedding backend.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the provider name.
    fn name(&self) -> &str;

    /// Fixed vector length for the configured model.
    fn dimension(&self) -> usize;

    /// Embeds one text. Blank input is [`EmbeddingError::InvalidInput`].
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Embeds many texts, reporting a result per input in order.
    ///
    /// The default runs [`embed`](Self::embed) sequentially.
    async fn batch_embed(&self, texts: &[String]) -> Vec<EmbeddingResult<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await);
        }
        results
    }
}

/// Trims and truncates input to at most `max_chars` characters.
pub(crate) fn prepare_input(text: &str, max_chars: usize) -> EmbeddingResult<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(EmbeddingError::InvalidInput("empty text for embedding".to_string()));
    }
    Ok(match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    })
}

/// Cosine similarity in `[-1, 1]`.
///
/// Empty vectors, mismatched lengths and zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors() {
        let v = [0.3, -0.2, 0.9];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_opposite_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_without_signal_is_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn prepare_input_trims_and_truncates_chars() {
        assert_eq!(prepare_input("  hello  ", 10).unwrap(), "hello");
        assert_eq!(prepare_input("đơn giản", 3).unwrap(), "đơn");
        assert!(matches!(
            prepare_input(" \n ", 10),
            Err(EmbeddingError::InvalidInput(_))
        ));
    }

    #[test]
    fn upstream_error_display() {
        let err = EmbeddingError::Upstream {
            status: Some(500),
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Upstream error (500): boom");
    }
}
