//! Search result types.
//!
//! Search results are ephemeral; they are never persisted.

use serde::{Deserialize, Serialize};

use super::Email;

/// Retrieval strategy that produced a search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    /// Remote provider search.
    Remote,
    /// Local substring/regex search.
    Local,
    /// Accent-insensitive edit-distance fallback.
    Fuzzy,
    /// Embedding cosine ranking.
    Semantic,
}

/// A single ranked hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub email: Email,
    /// Relevance score; 1.0 for structural matches.
    pub score: f32,
    pub source: SearchSource,
}

impl SearchResult {
    /// Creates a structural hit with full relevance.
    pub fn exact(email: Email, source: SearchSource) -> Self {
        Self {
            email,
            score: 1.0,
            source,
        }
    }
}

/// One page of hybrid search output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Hits ordered newest first.
    pub results: Vec<SearchResult>,
    /// Continuation cursor from the remote provider.
    pub next_page_token: Option<String>,
    /// Lower-bound estimate of the total number of matches.
    pub total_estimate: usize,
}

/// Kind of autocomplete suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Sender,
    Keyword,
}

/// An autocomplete suggestion for the search box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
}

/// Aggregate outcome of a batch embedding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingReport {
    pub processed: usize,
    pub failed: usize,
    pub remaining: usize,
}
