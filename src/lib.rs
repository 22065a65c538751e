//! Knowledge Crawler: a polite topic crawler
//!
//! This crate crawls a fixed list of seed sites, follows the direct links of
//! each seed page, respects robots.txt and politeness delays, extracts and
//! classifies English text, and reports progress through a live event stream.

pub mod config;
pub mod crawler;
pub mod events;
pub mod extract;
pub mod output;
pub mod robots;
pub mod state;
pub mod storage;
pub mod topics;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Crawler is already running (task {task_id})")]
    AlreadyRunning { task_id: String },

    #[error("Seed URL has no host: {0}")]
    InvalidSite(String),

    #[error("Task {0} is not the current crawl task")]
    UnknownTask(String),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid value for {var}: {message}")]
    Env { var: String, message: String },
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Orchestrator;
pub use events::{CrawlEvent, EventBus};
pub use state::TaskStatus;
pub use topics::TopicClassifier;
