//! Hand-written fakes for service unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{Email, EmailId};
use crate::embedding::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use crate::providers::email::{self, ProviderError, RemotePage, RemoteSearch, SearchStub};

pub(crate) fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
}

/// Decrements the in-flight counter when a fetch ends or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory remote search with a canned result page.
#[derive(Default)]
pub(crate) struct FakeRemote {
    details: Mutex<HashMap<String, Email>>,
    page: Mutex<RemotePage>,
    fail_search: AtomicBool,
    fetch_delay: Duration,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
    pub searches: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub fn add_detail(&self, id: &str, subject: &str) {
        self.add_email(Email::new(id, "remote-owner", at(1, 9)).with_subject(subject));
    }

    pub fn add_email(&self, email: Email) {
        self.details
            .lock()
            .unwrap()
            .insert(email.id.0.clone(), email);
    }

    /// Sets the page returned by every search.
    pub fn set_page(&self, ids: &[&str], next_page_token: Option<&str>, approx_total: usize) {
        *self.page.lock().unwrap() = RemotePage {
            stubs: ids.iter().map(|id| SearchStub::new(*id)).collect(),
            next_page_token: next_page_token.map(str::to_string),
            approx_total,
        };
    }

    pub fn fail_searches(&self) {
        self.fail_search.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteSearch for FakeRemote {
    async fn search(&self, _query: &str, _page_token: Option<&str>) -> email::Result<RemotePage> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(ProviderError::Connection("remote down".to_string()));
        }
        Ok(self.page.lock().unwrap().clone())
    }

    async fn fetch_detail(&self, id: &EmailId) -> email::Result<Email> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        self.details
            .lock()
            .unwrap()
            .get(&id.0)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.0.clone()))
    }
}

/// Embeds text by keyword lookup: the first registered keyword found in the
/// text selects its vector.
pub(crate) struct FakeEmbedder {
    dimension: usize,
    vectors: Vec<(String, Vec<f32>)>,
    pub calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_vector(mut self, keyword: &str, vector: Vec<f32>) -> Self {
        self.vectors.push((keyword.to_lowercase(), vector));
        self
    }
}

#[async_trait]
impl EmbeddingProvider for FakeEmbedder {
    fn name(&self) -> &str {
        "fake"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty".to_string()));
        }
        let lower = text.to_lowercase();
        self.vectors
            .iter()
            .find(|(keyword, _)| lower.contains(keyword.as_str()))
            .map(|(_, v)| v.clone())
            .ok_or_else(|| EmbeddingError::Upstream {
                status: Some(500),
                message: format!("no vector for {:?}", text),
            })
    }
}
