//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::TaskStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{now_timestamp, ArticleRecord, ArticleSummary, TaskRecord, TopicStat};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use url::Url;

const TOPIC_PAGE_LIMIT: i64 = 100;
const SEARCH_LIMIT: i64 = 50;

/// SQLite storage backend
///
/// The connection sits behind a mutex so the backend can be shared between
/// concurrent link workers.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// Parent directories are created when missing.
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("connection lock poisoned".to_string()))
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<TaskRecord> {
    Ok(TaskRecord {
        id: row.get(0)?,
        status: TaskStatus::from_db_string(&row.get::<_, String>(1)?)
            .unwrap_or(TaskStatus::Failed),
        progress: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<ArticleSummary> {
    Ok(ArticleSummary {
        url: row.get(0)?,
        title: row.get(1)?,
        topic: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Escapes LIKE wildcards so the query matches literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

impl Storage for SqliteStorage {
    // ===== Articles =====

    fn save_article(
        &self,
        url: &str,
        title: Option<&str>,
        content: &str,
        topic: &str,
    ) -> StorageResult<()> {
        let domain = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .unwrap_or_default();
        let now = now_timestamp();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO articles (url, domain, title, content, topic, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(url) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                topic = excluded.topic,
                updated_at = excluded.updated_at",
            params![url, domain, title, content, topic, now],
        )?;
        Ok(())
    }

    fn get_article(&self, url: &str) -> StorageResult<Option<ArticleRecord>> {
        let conn = self.conn()?;
        let article = conn
            .query_row(
                "SELECT id, url, domain, title, content, topic, created_at, updated_at
                 FROM articles WHERE url = ?1",
                params![url],
                |row| {
                    Ok(ArticleRecord {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        domain: row.get(2)?,
                        title: row.get(3)?,
                        content: row.get(4)?,
                        topic: row.get(5)?,
                        created_at: row.get(6)?,
                        updated_at: row.get(7)?,
                    })
                },
            )
            .optional()?;
        Ok(article)
    }

    fn articles_by_topic(&self, topic: &str) -> StorageResult<Vec<ArticleSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url, title, topic, created_at FROM articles
             WHERE topic = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;

        let articles = stmt
            .query_map(params![topic, TOPIC_PAGE_LIMIT], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    fn search_articles(&self, query: &str) -> StorageResult<Vec<ArticleSummary>> {
        let pattern = like_pattern(query);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url, title, topic, created_at FROM articles
             WHERE content LIKE ?1 ESCAPE '\\' OR title LIKE ?1 ESCAPE '\\'
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;

        let articles = stmt
            .query_map(params![pattern, SEARCH_LIMIT], summary_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    // ===== Tasks =====

    fn create_task(&self, task_id: &str, status: TaskStatus) -> StorageResult<()> {
        let now = now_timestamp();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO crawl_tasks (id, status, progress, created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?3)",
            params![task_id, status.to_db_string(), now],
        )?;
        Ok(())
    }

    fn update_task(&self, task_id: &str, status: TaskStatus) -> StorageResult<()> {
        let now = now_timestamp();
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE crawl_tasks SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![task_id, status.to_db_string(), now],
        )?;
        if changed == 0 {
            return Err(StorageError::TaskNotFound(task_id.to_string()));
        }
        Ok(())
    }

    fn update_progress(&self, task_id: &str, progress: f64) -> StorageResult<()> {
        let progress = progress.clamp(0.0, 100.0);
        let now = now_timestamp();
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE crawl_tasks SET progress = MAX(progress, ?2), updated_at = ?3 WHERE id = ?1",
            params![task_id, progress, now],
        )?;
        if changed == 0 {
            return Err(StorageError::TaskNotFound(task_id.to_string()));
        }
        Ok(())
    }

    fn get_task(&self, task_id: &str) -> StorageResult<Option<TaskRecord>> {
        let conn = self.conn()?;
        let task = conn
            .query_row(
                "SELECT id, status, progress, created_at, updated_at
                 FROM crawl_tasks WHERE id = ?1",
                params![task_id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    fn get_latest_task(&self) -> StorageResult<Option<TaskRecord>> {
        let conn = self.conn()?;
        let task = conn
            .query_row(
                "SELECT id, status, progress, created_at, updated_at
                 FROM crawl_tasks ORDER BY created_at DESC, rowid DESC LIMIT 1",
                [],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    // ===== Statistics =====

    fn count_articles(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM articles")
    }

    fn count_topics(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(DISTINCT topic) FROM articles")
    }

    fn count_running_tasks(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM crawl_tasks WHERE status = 'running'")
    }

    fn count_sites_crawled(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(DISTINCT domain) FROM articles")
    }

    fn last_update(&self) -> StorageResult<Option<String>> {
        let conn = self.conn()?;
        let last: Option<String> =
            conn.query_row("SELECT MAX(created_at) FROM articles", [], |row| row.get(0))?;
        Ok(last)
    }

    fn topic_stats(&self) -> StorageResult<Vec<TopicStat>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT topic, COUNT(*) AS count, MAX(created_at)
             FROM articles
             GROUP BY topic
             ORDER BY count DESC, topic ASC",
        )?;

        let stats = stmt
            .query_map([], |row| {
                Ok(TopicStat {
                    name: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u64,
                    last_update: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(stats)
    }
}
