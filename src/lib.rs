//! mailboard - Hybrid email search and Kanban workflow engine
//!
//! This crate merges remote provider search with a local SQLite index,
//! ranks semantic matches by embedding similarity, and tracks each email's
//! position on a Kanban board, including snoozes that a background
//! scheduler restores once they elapse. [`server`] serves it all over HTTP.

pub mod api;
pub mod config;
pub mod domain;
pub mod embedding;
pub mod providers;
pub mod search;
pub mod server;
pub mod services;
pub mod storage;

pub use api::{Api, ApiError};
pub use config::Settings;
