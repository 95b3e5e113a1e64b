//! Local email cache and Kanban configuration storage.
//!
//! - SQLite database holding cached emails, workflow state and columns
//! - A `REGEXP` SQL function for accent-insensitive local search
//! - Async-safe database operations via tokio::task::spawn_blocking

mod database;
pub mod queries;
mod schema;

pub use database::{Database, DatabaseError, Result};
