//! Embedding-backed semantic search and batch embedding generation.

use std::cmp::Ordering;
use std::sync::Arc;

use super::search_service::{Result, SearchError};
use crate::domain::{Email, EmbeddingReport, OwnerId, SearchResult, SearchSource};
use crate::embedding::{cosine_similarity, EmbeddingError, EmbeddingProvider};
use crate::storage::queries::emails;
use crate::storage::{Database, DatabaseError};

const DEFAULT_SEARCH_LIMIT: usize = 10;
const MAX_SEARCH_LIMIT: usize = 50;
const DEFAULT_BATCH_LIMIT: usize = 50;
const MAX_BATCH_LIMIT: usize = 100;

/// Clamps a requested semantic result count. Non-positive means default.
pub fn search_limit(requested: i64) -> usize {
    clamp_limit(requested, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT)
}

/// Clamps a requested embedding batch size. Non-positive means default.
pub fn batch_limit(requested: i64) -> usize {
    clamp_limit(requested, DEFAULT_BATCH_LIMIT, MAX_BATCH_LIMIT)
}

fn clamp_limit(requested: i64, default: usize, max: usize) -> usize {
    if requested <= 0 {
        default
    } else {
        (requested as u64).min(max as u64) as usize
    }
}

/// Ranks an owner's stored vectors against a query embedding.
pub struct SemanticService {
    db: Database,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SemanticService {
    pub fn new(db: Database, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { db, embedder }
    }

    pub fn provider_name(&self) -> &str {
        self.embedder.name()
    }

    /// Returns the emails closest to `query`, best first.
    ///
    /// Only emails that already carry an embedding are considered. A query
    /// vector of the wrong dimension is an error; stored vectors of another
    /// length are skipped. An empty result is not an error.
    pub async fn semantic_search(
        &self,
        owner_id: &OwnerId,
        query: &str,
        limit: i64,
    ) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery("query must not be empty".to_string()));
        }
        let limit = search_limit(limit);

        let query_vector = self.embedder.embed(query).await?;
        let expected = self.embedder.dimension();
        if query_vector.len() != expected {
            return Err(EmbeddingError::DimensionMismatch {
                expected,
                actual: query_vector.len(),
            }
            .into());
        }
        let candidates = emails::with_embeddings(&self.db, owner_id).await?;

        let mut results: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|mut email| {
                let stored = email.embedding.take()?;
                if stored.len() != query_vector.len() {
                    return None;
                }
                let score = cosine_similarity(&query_vector, &stored);
                Some(SearchResult {
                    email,
                    score,
                    source: SearchSource::Semantic,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.email.id.cmp(&b.email.id))
        });
        results.truncate(limit);
        Ok(results)
    }

    /// Embeds up to `limit` of the owner's newest emails that lack a vector.
    ///
    /// Per-item failures are counted, not propagated. An unconfigured
    /// provider fails the whole run before anything is written.
    pub async fn generate_embeddings(&self, owner_id: &OwnerId, limit: i64) -> Result<EmbeddingReport> {
        let batch = emails::missing_embeddings(&self.db, owner_id, batch_limit(limit)).await?;
        let mut report = EmbeddingReport::default();

        if !batch.is_empty() {
            let texts: Vec<String> = batch.iter().map(Email::embedding_text).collect();
            let vectors = self.embedder.batch_embed(&texts).await;
            let expected = self.embedder.dimension();

            for (email, result) in batch.iter().zip(vectors) {
                let vector = match result {
                    Ok(vector) if vector.len() == expected => vector,
                    Ok(vector) => {
                        report.failed += 1;
                        let e = EmbeddingError::DimensionMismatch {
                            expected,
                            actual: vector.len(),
                        };
                        tracing::warn!(email_id = %email.id, "Rejected embedding: {}", e);
                        continue;
                    }
                    Err(EmbeddingError::ProviderUnavailable(message)) => {
                        return Err(EmbeddingError::ProviderUnavailable(message).into());
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(email_id = %email.id, "Failed to embed email: {}", e);
                        continue;
                    }
                };

                match emails::set_embedding(&self.db, owner_id, &email.id, vector).await {
                    Ok(true) => report.processed += 1,
                    Ok(false) => report.failed += 1,
                    Err(e @ DatabaseError::DimensionMismatch { .. }) => {
                        report.failed += 1;
                        tracing::warn!(email_id = %email.id, "Failed to store embedding: {}", e);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        report.remaining = emails::count_missing_embeddings(&self.db, owner_id).await?;
        tracing::info!(
            owner_id = %owner_id,
            provider = self.embedder.name(),
            processed = report.processed,
            failed = report.failed,
            remaining = report.remaining,
            "embedding batch complete"
        );
        Ok(report)
    }
}
