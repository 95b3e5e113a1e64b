//! Remote search provider trait definition.
//!
//! This module defines the [`RemoteSearch`] trait which abstracts over the
//! mail provider's keyword search. A search returns lightweight stubs; full
//! records are fetched one at a time with [`RemoteSearch::fetch_detail`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{Email, EmailId};

/// Result type alias for remote provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// Errors that can occur during remote provider operations.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Authentication failed or credentials expired.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Network or connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs:?} seconds")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: Option<u64>,
    },

    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request or parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider-specific error.
    #[error("provider error: {0}")]
    Provider(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A search hit before enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStub {
    pub id: EmailId,
    pub thread_id: Option<String>,
}

impl SearchStub {
    pub fn new(id: impl Into<EmailId>) -> Self {
        Self {
            id: id.into(),
            thread_id: None,
        }
    }
}

/// One page of remote search output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotePage {
    pub stubs: Vec<SearchStub>,
    /// Opaque continuation cursor.
    pub next_page_token: Option<String>,
    /// Provider estimate; a lower bound, not an exact count.
    pub approx_total: usize,
}

/// Keyword search against the remote mail provider.
///
/// Implementations must be `Send + Sync` so one instance can serve many
/// concurrent searches and detail fetches.
#[async_trait]
pub trait RemoteSearch: Send + Sync {
    /// Searches by keyword, continuing from `page_token` when given.
    async fn search(&self, query: &str, page_token: Option<&str>) -> Result<RemotePage>;

    /// Fetches the full record for a stub.
    async fn fetch_detail(&self, id: &EmailId) -> Result<Email>;
}
