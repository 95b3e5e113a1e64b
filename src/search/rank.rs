//! Merging and ordering of hybrid search results.

use std::collections::HashSet;

use crate::domain::{EmailId, SearchResult};

/// Merges remote and local hits, keeping one entry per email id.
///
/// Remote hits win on collision. The output is unordered; call [`rank`].
pub fn merge(remote: Vec<SearchResult>, local: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<EmailId> = HashSet::with_capacity(remote.len() + local.len());
    let mut merged = Vec::with_capacity(remote.len() + local.len());

    for result in remote.into_iter().chain(local) {
        if seen.insert(result.email.id.clone()) {
            merged.push(result);
        }
    }

    merged
}

/// Returns true if the fuzzy tier should run.
///
/// Only when nothing else matched and the trimmed query is longer than `min_len` chars.
pub fn fuzzy_fallback_applies(query: &str, merged_len: usize, min_len: usize) -> bool {
    merged_len == 0 && query.trim().chars().count() > min_len
}

/// Sorts newest first, breaking ties by ascending id.
pub fn rank(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.email
            .received_at
            .cmp(&a.email.received_at)
            .then_with(|| a.email.id.cmp(&b.email.id))
    });
}

/// The remote estimate is a lower bound; never report fewer than we return.
pub fn total_estimate(approx_total: usize, result_len: usize) -> usize {
    approx_total.max(result_len)
}
