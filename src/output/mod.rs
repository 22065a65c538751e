//! Output module for saved articles and crawl statistics
//!
//! This module handles:
//! - Writing saved articles as markdown files, grouped by topic
//! - Loading and printing the dashboard statistics

mod markdown;
pub mod stats;

pub use markdown::{export_file_name, format_article, MarkdownExporter};
pub use stats::{load_statistics, print_statistics, CrawlStatistics, NEVER};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
