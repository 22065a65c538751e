//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::TaskStatus;
use crate::storage::{ArticleRecord, ArticleSummary, TaskRecord, TopicStat};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Methods take `&self` so one backend can be shared across the crawl's
/// concurrent link workers; implementations synchronize internally.
pub trait Storage: Send + Sync {
    // ===== Articles =====

    /// Inserts an article or replaces the content, title, and topic of the
    /// existing row for the same URL
    fn save_article(
        &self,
        url: &str,
        title: Option<&str>,
        content: &str,
        topic: &str,
    ) -> StorageResult<()>;

    /// Gets an article by URL
    fn get_article(&self, url: &str) -> StorageResult<Option<ArticleRecord>>;

    /// Articles of one topic, newest first, at most 100
    fn articles_by_topic(&self, topic: &str) -> StorageResult<Vec<ArticleSummary>>;

    /// Case-insensitive substring search over content and title, newest
    /// first, at most 50
    fn search_articles(&self, query: &str) -> StorageResult<Vec<ArticleSummary>>;

    // ===== Tasks =====

    /// Creates a task record with the given status and zero progress
    fn create_task(&self, task_id: &str, status: TaskStatus) -> StorageResult<()>;

    /// Updates the status of a task
    fn update_task(&self, task_id: &str, status: TaskStatus) -> StorageResult<()>;

    /// Updates the progress (0 to 100) of a task; progress never decreases
    fn update_progress(&self, task_id: &str, progress: f64) -> StorageResult<()>;

    /// Gets a task by ID
    fn get_task(&self, task_id: &str) -> StorageResult<Option<TaskRecord>>;

    /// Gets the most recently created task
    fn get_latest_task(&self) -> StorageResult<Option<TaskRecord>>;

    // ===== Statistics =====

    /// Total number of articles
    fn count_articles(&self) -> StorageResult<u64>;

    /// Number of distinct topics with at least one article
    fn count_topics(&self) -> StorageResult<u64>;

    /// Number of tasks whose status is `running`
    fn count_running_tasks(&self) -> StorageResult<u64>;

    /// Number of distinct hosts with at least one article
    fn count_sites_crawled(&self) -> StorageResult<u64>;

    /// Creation time of the newest article
    fn last_update(&self) -> StorageResult<Option<String>>;

    /// Article count and newest creation time per topic, largest first
    fn topic_stats(&self) -> StorageResult<Vec<TopicStat>>;
}
