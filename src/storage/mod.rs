//! Storage module for persisting crawl results
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Article upserts and read-side queries
//! - Crawl task status and progress tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::TaskStatus;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Current time as a fixed-width RFC 3339 UTC timestamp
///
/// Fixed width keeps lexicographic order equal to chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A stored article
#[derive(Debug, Clone, Serialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub url: String,
    pub domain: String,
    pub title: Option<String>,
    pub content: String,
    pub topic: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Article listing entry (no content)
#[derive(Debug, Clone, Serialize)]
pub struct ArticleSummary {
    pub url: String,
    pub title: Option<String>,
    pub topic: String,
    pub created_at: String,
}

impl ArticleSummary {
    /// Title for display, `Untitled` when none was extracted
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

/// A crawl task row
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub created_at: String,
    pub updated_at: String,
}

/// Per-topic article count
#[derive(Debug, Clone, Serialize)]
pub struct TopicStat {
    pub name: String,
    pub count: u64,
    pub last_update: Option<String>,
}
