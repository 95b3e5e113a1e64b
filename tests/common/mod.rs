//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use mailboard::domain::{Email, EmailId, OwnerId};
use mailboard::providers::email::{self, ProviderError, RemotePage, RemoteSearch, SearchStub};
use mailboard::services::SearchService;
use mailboard::storage::queries::emails;
use mailboard::storage::Database;
use mailboard::config::SearchSettings;

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
}

pub fn owner() -> OwnerId {
    OwnerId::from("u1")
}

/// Remote provider that serves a fixed page and a fixed set of details.
#[derive(Default)]
pub struct StubRemote {
    details: Mutex<HashMap<String, Email>>,
    page: Mutex<RemotePage>,
    down: AtomicBool,
    pub detail_calls: AtomicUsize,
}

impl StubRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, emails: Vec<Email>, approx_total: usize) {
        let mut details = self.details.lock().unwrap();
        let stubs = emails.iter().map(|e| SearchStub::new(e.id.0.as_str())).collect();
        for email in emails {
            details.insert(email.id.0.clone(), email);
        }
        *self.page.lock().unwrap() = RemotePage {
            stubs,
            next_page_token: None,
            approx_total,
        };
    }

    /// Lists a stub whose detail fetch will fail.
    pub fn add_broken_stub(&self, id: &str) {
        self.page.lock().unwrap().stubs.push(SearchStub::new(id));
    }

    pub fn go_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteSearch for StubRemote {
    async fn search(&self, _query: &str, _page_token: Option<&str>) -> email::Result<RemotePage> {
        if self.down.load(Ordering::SeqCst) {
            return Err(ProviderError::Connection("connection refused".to_string()));
        }
        Ok(self.page.lock().unwrap().clone())
    }

    async fn fetch_detail(&self, id: &EmailId) -> email::Result<Email> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.details
            .lock()
            .unwrap()
            .get(&id.0)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.0.clone()))
    }
}

pub async fn memory_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

pub async fn store(db: &Database, emails: Vec<Email>) {
    emails::upsert_many(db, emails).await.unwrap();
}

pub fn search_service(db: &Database, remote: &Arc<StubRemote>) -> SearchService {
    SearchService::new(db.clone(), remote.clone(), SearchSettings::default())
}
