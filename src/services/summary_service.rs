//! Email summarization.
//!
//! [`Summarizer`] is the seam for any summarization backend. The bundled
//! [`ExtractiveSummarizer`] picks the most representative sentences locally.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::domain::{EmailId, OwnerId};
use crate::search::strip_html;
use crate::storage::queries::emails;
use crate::storage::{Database, DatabaseError};

/// Errors that can occur while summarizing.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Email not found: {0}")]
    EmailNotFound(EmailId),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// Result type for summary operations.
pub type Result<T> = std::result::Result<T, SummaryError>;

/// Produces a short summary of plain text. May return an empty string.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> String;
}

/// Frequency-based extractive summarizer.
///
/// Scores each sentence by the average corpus frequency of its words
/// (words of three or more chars count towards frequency), keeps the best
/// sentences in their original order and caps the output length.
#[derive(Debug, Clone)]
pub struct ExtractiveSummarizer {
    sentences: usize,
    max_chars: usize,
}

impl Default for ExtractiveSummarizer {
    fn default() -> Self {
        Self {
            sentences: 2,
            max_chars: 300,
        }
    }
}

impl ExtractiveSummarizer {
    pub fn new(sentences: usize, max_chars: usize) -> Self {
        Self {
            sentences: sentences.max(1),
            max_chars,
        }
    }

    pub fn extract(&self, text: &str) -> String {
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }

        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return truncate_chars(text, self.max_chars);
        }

        let mut freq: HashMap<String, f32> = HashMap::new();
        for sentence in &sentences {
            for word in words(sentence) {
                if word.chars().count() > 2 {
                    *freq.entry(word).or_default() += 1.0;
                }
            }
        }
        if freq.is_empty() {
            return truncate_chars(&sentences.join(" "), self.max_chars);
        }

        let mut scored: Vec<(usize, f32)> = sentences
            .iter()
            .enumerate()
            .map(|(idx, sentence)| {
                let words = words(sentence);
                let total: f32 = words.iter().map(|w| freq.get(w).copied().unwrap_or(0.0)).sum();
                let score = if words.is_empty() {
                    0.0
                } else {
                    total / words.len() as f32
                };
                (idx, score)
            })
            .collect();

        // Stable sort keeps earlier sentences ahead on equal scores.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let mut chosen: Vec<usize> = scored.iter().take(self.sentences).map(|(idx, _)| *idx).collect();
        chosen.sort_unstable();

        let mut parts: Vec<&str> = Vec::new();
        let mut len = 0;
        for idx in chosen {
            let sentence = sentences[idx];
            let sentence_len = sentence.chars().count();
            if len > 0 && len + sentence_len > self.max_chars {
                break;
            }
            parts.push(sentence);
            len += sentence_len;
        }

        truncate_chars(&parts.join(" "), self.max_chars)
    }
}

#[async_trait]
impl Summarizer for ExtractiveSummarizer {
    async fn summarize(&self, text: &str) -> String {
        self.extract(text)
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    static SENTENCE: OnceLock<Option<Regex>> = OnceLock::new();
    match SENTENCE.get_or_init(|| Regex::new(r"[^.!?\n]+[.!?]?").ok()) {
        Some(re) => re
            .find_iter(text)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty())
            .collect(),
        None => vec![text],
    }
}

fn words(sentence: &str) -> Vec<String> {
    sentence
        .to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().trim().to_string()
}

/// Summarizes stored emails and saves the result.
pub struct SummaryService {
    db: Database,
    summarizer: Arc<dyn Summarizer>,
}

impl SummaryService {
    pub fn new(db: Database, summarizer: Arc<dyn Summarizer>) -> Self {
        Self { db, summarizer }
    }

    /// Summarizes an email's body, falling back to its preview, and stores the result.
    ///
    /// A blank summary is returned but never overwrites a stored one.
    pub async fn summarize_and_save(&self, owner_id: &OwnerId, email_id: &EmailId) -> Result<String> {
        let email = emails::get_by_id(&self.db, owner_id, email_id)
            .await?
            .ok_or_else(|| SummaryError::EmailNotFound(email_id.clone()))?;

        let source = if email.body_text.trim().is_empty() {
            &email.preview
        } else {
            &email.body_text
        };
        let text = strip_html(source);

        let summary = self.summarizer.summarize(&text).await.trim().to_string();
        if summary.is_empty() {
            tracing::debug!(email_id = %email_id, "Summarizer returned nothing, keeping stored summary");
            return Ok(summary);
        }

        emails::set_summary(&self.db, owner_id, email_id, &summary).await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Email;
    use crate::services::testing::at;

    struct Silent;

    #[async_trait]
    impl Summarizer for Silent {
        async fn summarize(&self, _text: &str) -> String {
            String::new()
        }
    }

    #[test]
    fn extract_picks_frequent_sentences_in_order() {
        let text = "The budget review is Friday. Lunch was nice. \
                    Please send the budget review notes before the review.";
        let summary = ExtractiveSummarizer::default().extract(text);
        assert_eq!(
            summary,
            "The budget review is Friday. Please send the budget review notes before the review."
        );
    }

    #[test]
    fn extract_caps_length() {
        let long = "word ".repeat(200);
        let summary = ExtractiveSummarizer::new(2, 50).extract(&long);
        assert!(summary.chars().count() <= 50);
        assert!(ExtractiveSummarizer::default().extract("   ").is_empty());
    }

    #[tokio::test]
    async fn summarize_and_save_strips_html() {
        let db = Database::open_in_memory().await.unwrap();
        emails::upsert(
            &db,
            &Email::new("m1", "u1", at(1, 0))
                .with_body("<p>Quarterly numbers are final.</p><p>Quarterly call moved.</p>"),
        )
        .await
        .unwrap();
        let service = SummaryService::new(db.clone(), Arc::new(ExtractiveSummarizer::default()));

        let summary = service
            .summarize_and_save(&"u1".into(), &"m1".into())
            .await
            .unwrap();
        assert!(!summary.contains('<'));
        assert!(summary.contains("Quarterly"));

        let stored = emails::get_by_id(&db, &"u1".into(), &"m1".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.summary.as_deref(), Some(summary.as_str()));
    }

    #[tokio::test]
    async fn blank_summary_keeps_existing() {
        let db = Database::open_in_memory().await.unwrap();
        emails::upsert(&db, &Email::new("m1", "u1", at(1, 0)).with_body("Hello there."))
            .await
            .unwrap();
        emails::set_summary(&db, &"u1".into(), &"m1".into(), "Earlier summary")
            .await
            .unwrap();

        let service = SummaryService::new(db.clone(), Arc::new(Silent));
        let summary = service
            .summarize_and_save(&"u1".into(), &"m1".into())
            .await
            .unwrap();
        assert!(summary.is_empty());

        let stored = emails::get_by_id(&db, &"u1".into(), &"m1".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.summary.as_deref(), Some("Earlier summary"));
    }

    #[tokio::test]
    async fn missing_email_is_reported() {
        let db = Database::open_in_memory().await.unwrap();
        let service = SummaryService::new(db, Arc::new(ExtractiveSummarizer::default()));
        let err = service
            .summarize_and_save(&"u1".into(), &"nope".into())
            .await
            .unwrap_err();
        assert!(matches!(err, SummaryError::EmailNotFound(_)));
    }
}
