//! Markdown export of saved articles
//!
//! Each article is written to
//! `{root}/{topic}/{YYYYmmdd_HHMMSS}_{host}_{hash}.md`, where `host` has its
//! dots replaced by underscores and `hash` is the first 8 hex digits of the
//! SHA-256 of the URL.

use crate::output::{OutputError, OutputResult};
use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Writes saved articles below a root directory
#[derive(Debug, Clone)]
pub struct MarkdownExporter {
    root: PathBuf,
}

impl MarkdownExporter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes one article and returns the path of the new file
    pub fn export(&self, url: &Url, topic: &str, content: &str) -> OutputResult<PathBuf> {
        self.export_at(url, topic, content, Utc::now())
    }

    fn export_at(
        &self,
        url: &Url,
        topic: &str,
        content: &str,
        crawled_at: DateTime<Utc>,
    ) -> OutputResult<PathBuf> {
        let dir_name = sanitize_component(topic);
        if dir_name.is_empty() {
            return Err(OutputError::Write(format!("invalid topic name '{}'", topic)));
        }

        let dir = self.root.join(dir_name);
        fs::create_dir_all(&dir)?;

        let path = dir.join(export_file_name(url, crawled_at));
        fs::write(&path, format_article(url, topic, content, crawled_at))?;

        tracing::debug!("Exported {} to {}", url, path.display());
        Ok(path)
    }
}

/// File name of an exported article
pub fn export_file_name(url: &Url, crawled_at: DateTime<Utc>) -> String {
    let host = url.host_str().unwrap_or("unknown").replace('.', "_");
    let digest = hex::encode(Sha256::digest(url.as_str().as_bytes()));

    format!(
        "{}_{}_{}.md",
        crawled_at.format("%Y%m%d_%H%M%S"),
        sanitize_component(&host),
        &digest[..8]
    )
}

/// Formats an article as markdown with its metadata header
pub fn format_article(url: &Url, topic: &str, content: &str, crawled_at: DateTime<Utc>) -> String {
    format!(
        "# {url}\n\n**Source:** {url}\n**Topic:** {topic}\n**Crawled:** {crawled}\n\n---\n\n{content}\n",
        url = url,
        topic = topic,
        crawled = crawled_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        content = content,
    )
}

/// Keeps a path component inside its parent directory
fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
