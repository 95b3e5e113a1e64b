//! Search building blocks.
//!
//! Text normalization, the fuzzy fallback matcher and result ranking. The
//! orchestration that ties these to storage and the remote provider lives in
//! [`crate::services::SearchService`].

pub mod fuzzy;
pub mod rank;
pub mod text;

pub use fuzzy::FuzzyMatcher;
pub use text::{contextual_snippet, edit_distance, fold_accents, relaxed_pattern, strip_html};
