//! Statistics generation from the article database
//!
//! This module provides the dashboard aggregate and its terminal rendering.

use crate::output::OutputResult;
use crate::storage::{Storage, TopicStat};
use serde::Serialize;

/// Shown when no article has been saved yet
pub const NEVER: &str = "Never";

/// Dashboard statistics
#[derive(Debug, Clone, Serialize)]
pub struct CrawlStatistics {
    /// Total number of saved articles
    pub total_articles: u64,

    /// Tasks currently marked running
    pub active_crawlers: u64,

    /// Number of distinct topics with at least one article
    pub topics_covered: u64,

    /// Timestamp of the most recent article, or `Never`
    pub last_update: String,

    /// Article count per topic, largest first
    pub topics: Vec<TopicStat>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> OutputResult<CrawlStatistics> {
    Ok(CrawlStatistics {
        total_articles: storage.count_articles()?,
        active_crawlers: storage.count_running_tasks()?,
        topics_covered: storage.count_topics()?,
        last_update: storage.last_update()?.unwrap_or_else(|| NEVER.to_string()),
        topics: storage.topic_stats()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Knowledge Base Statistics ===\n");

    println!("Overview:");
    println!("  Total articles: {}", stats.total_articles);
    println!("  Active crawlers: {}", stats.active_crawlers);
    println!("  Topics covered: {}", stats.topics_covered);
    println!("  Last update: {}", stats.last_update);
    println!();

    if stats.topics.is_empty() {
        return;
    }

    println!("Articles by Topic:");
    for topic in &stats.topics {
        let percentage = if stats.total_articles > 0 {
            (topic.count as f64 / stats.total_articles as f64) * 100.0
        } else {
            0.0
        };
        println!(
            "  {}: {} ({:.1}%), last {}",
            topic.name,
            topic.count,
            percentage,
            topic.last_update.as_deref().unwrap_or(NEVER)
        );
    }
}
