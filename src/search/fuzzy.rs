//! Last-resort fuzzy matching over cached emails.

use crate::domain::{Email, SearchResult, SearchSource};

use super::text::{edit_distance, fold_accents};

/// Edit-distance matcher against an accent-folded query.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    folded_query: String,
    threshold: usize,
}

impl FuzzyMatcher {
    pub fn new(query: &str, threshold: usize) -> Self {
        Self {
            folded_query: fold_accents(query.trim()),
            threshold,
        }
    }

    /// Returns the accepted distance, trying the subject first and then the summary.
    pub fn distance(&self, email: &Email) -> Option<(usize, usize)> {
        let subject = fold_accents(&email.subject);
        let d = edit_distance(&self.folded_query, &subject);
        if d <= self.threshold {
            return Some((d, self.max_len(&subject)));
        }

        let summary = fold_accents(email.summary.as_deref().unwrap_or_default());
        let d = edit_distance(&self.folded_query, &summary);
        if d <= self.threshold {
            return Some((d, self.max_len(&summary)));
        }

        None
    }

    /// Scores a candidate, or `None` if it is too far from the query.
    pub fn score(&self, email: &Email) -> Option<f32> {
        self.distance(email).map(|(d, max_len)| {
            if max_len == 0 {
                1.0
            } else {
                1.0 - d as f32 / max_len as f32
            }
        })
    }

    /// Scans candidates, keeping non-trashed matches tagged as fuzzy.
    pub fn scan(&self, candidates: Vec<Email>) -> Vec<SearchResult> {
        candidates
            .into_iter()
            .filter(|email| !email.is_trashed())
            .filter_map(|email| {
                self.score(&email).map(|score| SearchResult {
                    email,
                    score,
                    source: SearchSource::Fuzzy,
                })
            })
            .collect()
    }

    fn max_len(&self, other: &str) -> usize {
        self.folded_query.chars().count().max(other.chars().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn email(id: &str, subject: &str) -> Email {
        Email::new(id, "u1", Utc::now()).with_subject(subject)
    }

    #[test]
    fn near_miss_subject_matches() {
        let matcher = FuzzyMatcher::new("xkcqz", 3);
        let (d, max_len) = matcher.distance(&email("m1", "xkcqy")).unwrap();
        assert_eq!((d, max_len), (1, 5));
        assert!((matcher.score(&email("m1", "xkcqy")).unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn distant_subject_is_rejected() {
        let matcher = FuzzyMatcher::new("xkcqz", 3);
        assert!(matcher.distance(&email("m1", "quarterly report")).is_none());
    }

    #[test]
    fn summary_is_checked_when_subject_misses() {
        let matcher = FuzzyMatcher::new("meeting", 3);
        let mut e = email("m1", "Re: Fwd: unrelated thread");
        e.summary = Some("Meetng".to_string());
        assert_eq!(matcher.distance(&e).map(|(d, _)| d), Some(1));
    }

    #[test]
    fn accents_are_folded_before_comparison() {
        let matcher = FuzzyMatcher::new("hoa don", 0);
        assert!(matcher.distance(&email("m1", "Hóa Đơn")).is_some());
    }

    #[test]
    fn scan_skips_trash() {
        let matcher = FuzzyMatcher::new("xkcqz", 3);
        let hits = matcher.scan(vec![
            email("m1", "xkcqy"),
            email("m2", "xkcqq").with_labels(["TRASH"]),
        ]);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].email.id.0, "m1");
        assert_eq!(hits[0].source, SearchSource::Fuzzy);
    }
}
