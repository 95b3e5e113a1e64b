//! Hybrid search service.
//!
//! [`SearchService::hybrid_search`] queries the remote provider and the local
//! index concurrently, enriches remote stubs, merges both sides and falls back
//! to an edit-distance scan when nothing matched. Remote hits are written back
//! to the local index in the background.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::detail_fetcher::DetailFetcher;
use crate::config::SearchSettings;
use crate::domain::{
    Email, OwnerId, SearchPage, SearchResult, SearchSource, Suggestion, SuggestionKind,
};
use crate::embedding::EmbeddingError;
use crate::providers::email::{ProviderError, RemoteSearch};
use crate::search::{contextual_snippet, rank, FuzzyMatcher};
use crate::storage::queries::emails::{self, TextSearch};
use crate::storage::{Database, DatabaseError};

const SENDER_SUGGESTIONS: usize = 3;
const KEYWORD_SUGGESTIONS: usize = 2;
const SENDER_SCAN_LIMIT: usize = 500;
const SUBJECT_SCAN_LIMIT: usize = 200;

/// Errors that can occur during search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Remote search failed: {0}")]
    Remote(#[from] ProviderError),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Search cancelled")]
    Cancelled,
}

/// Result type for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Answers keyword searches across the remote provider and the local index.
pub struct SearchService {
    db: Database,
    remote: Arc<dyn RemoteSearch>,
    fetcher: DetailFetcher,
    settings: SearchSettings,
    background: TaskTracker,
}

impl SearchService {
    pub fn new(db: Database, remote: Arc<dyn RemoteSearch>, settings: SearchSettings) -> Self {
        Self {
            db,
            remote,
            fetcher: DetailFetcher::new(settings.detail_concurrency),
            settings,
            background: TaskTracker::new(),
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Runs a hybrid search for one page of results.
    ///
    /// A remote failure fails the request. A local failure is logged and the
    /// search continues with remote results only. Cancelling `cancel` aborts
    /// in-flight enrichment and returns [`SearchError::Cancelled`]; the
    /// background cache-warm write is not tied to it.
    pub async fn hybrid_search(
        &self,
        owner_id: &OwnerId,
        query: &str,
        page_token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<SearchPage> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidQuery("query must not be empty".to_string()));
        }

        let local_search = TextSearch::relaxed(owner_id, query, self.settings.local_limit);
        let (remote, local) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SearchError::Cancelled),
            pair = async {
                tokio::join!(
                    self.remote.search(query, page_token),
                    emails::search_text(&self.db, local_search),
                )
            } => pair,
        };

        let page = remote?;
        let local = local.unwrap_or_else(|e| {
            tracing::warn!(owner_id = %owner_id, "Local search failed, using remote results only: {}", e);
            Vec::new()
        });

        let fetched = self
            .fetcher
            .enrich(self.remote.as_ref(), &page.stubs, cancel)
            .await
            .ok_or(SearchError::Cancelled)?;

        let fetched: Vec<Email> = fetched
            .into_iter()
            .map(|mut email| {
                email.owner_id = owner_id.clone();
                email
            })
            .collect();
        self.warm_cache(fetched.clone());

        // Trashed hits still refresh the local copy above, but are never returned.
        let remote_hits = fetched
            .into_iter()
            .filter(|email| !email.is_trashed())
            .map(|mut email| {
                if let Some(snippet) =
                    contextual_snippet(&email.body_text, query, self.settings.snippet_context)
                {
                    email.preview = snippet;
                }
                SearchResult::exact(email, SearchSource::Remote)
            })
            .collect();
        let local_hits = local
            .into_iter()
            .map(|email| SearchResult::exact(email, SearchSource::Local))
            .collect();

        let mut results = rank::merge(remote_hits, local_hits);

        if rank::fuzzy_fallback_applies(query, results.len(), self.settings.min_fuzzy_query_len) {
            match emails::list_active(&self.db, owner_id).await {
                Ok(candidates) => {
                    let matcher = FuzzyMatcher::new(query, self.settings.fuzzy_threshold);
                    results.extend(matcher.scan(candidates));
                }
                Err(e) => {
                    tracing::warn!(owner_id = %owner_id, "Fuzzy fallback failed: {}", e);
                }
            }
        }

        rank::rank(&mut results);
        let total_estimate = rank::total_estimate(page.approx_total, results.len());

        tracing::debug!(
            owner_id = %owner_id,
            results = results.len(),
            total_estimate,
            "hybrid search complete"
        );

        Ok(SearchPage {
            results,
            next_page_token: page.next_page_token,
            total_estimate,
        })
    }

    /// Upserts remote hits into the local index without blocking the caller.
    fn warm_cache(&self, batch: Vec<Email>) {
        if batch.is_empty() {
            return;
        }

        let db = self.db.clone();
        let timeout = self.settings.cache_warm_timeout();

        self.background.spawn(async move {
            let count = batch.len();
            match tokio::time::timeout(timeout, emails::upsert_many(&db, batch)).await {
                Ok(Ok(written)) => tracing::debug!(written, "Warmed local index"),
                Ok(Err(e)) => tracing::warn!("Failed to warm local index: {}", e),
                Err(_) => tracing::warn!(
                    "Local index warm timed out after {:?} ({} emails)",
                    timeout,
                    count
                ),
            }
        });
    }

    /// Waits for pending background writes to finish.
    pub async fn flush_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Autocomplete suggestions for a search prefix.
    ///
    /// Up to three senders whose name or address contains the prefix,
    /// followed by up to two subject keywords starting with it.
    pub async fn suggestions(&self, owner_id: &OwnerId, prefix: &str) -> Result<Vec<Suggestion>> {
        let needle = prefix.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut suggestions = Vec::new();
        let mut seen = HashSet::new();

        for sender in emails::distinct_senders(&self.db, owner_id, SENDER_SCAN_LIMIT).await? {
            let name = sender.name.as_deref().unwrap_or("").to_lowercase();
            if !name.contains(&needle) && !sender.email.to_lowercase().contains(&needle) {
                continue;
            }
            let text = sender.display_name().to_string();
            if text.is_empty() || !seen.insert(text.to_lowercase()) {
                continue;
            }
            suggestions.push(Suggestion {
                text,
                kind: SuggestionKind::Sender,
            });
            if suggestions.len() == SENDER_SUGGESTIONS {
                break;
            }
        }

        let mut keywords = 0;
        'subjects: for subject in emails::recent_subjects(&self.db, owner_id, SUBJECT_SCAN_LIMIT).await? {
            for word in subject.split_whitespace() {
                let word = word.trim_matches(|c: char| !c.is_alphanumeric());
                if word.chars().count() < 3 {
                    continue;
                }
                let lower = word.to_lowercase();
                if !lower.starts_with(&needle) || !seen.insert(lower) {
                    continue;
                }
                suggestions.push(Suggestion {
                    text: word.to_string(),
                    kind: SuggestionKind::Keyword,
                });
                keywords += 1;
                if keywords == KEYWORD_SUGGESTIONS {
                    break 'subjects;
                }
            }
        }

        Ok(suggestions)
    }
}
