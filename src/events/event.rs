//! Crawl event records
//!
//! Events serialize as one flat JSON object: `type`, `task_id`, `timestamp`,
//! then the payload keys.

use crate::storage::now_timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Every kind of event the crawler publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // ===== Task lifecycle =====
    CrawlStart,
    Progress,
    CrawlComplete,
    CrawlStopped,
    CrawlError,

    // ===== Site lifecycle =====
    SiteBegin,
    SiteLinks,
    SiteComplete,
    SiteError,
    SiteSkip,
    SiteException,

    // ===== Per-link outcomes =====
    RobotsDisallow,
    RobotsMetaSkip,
    FetchBackoff,
    FetchError,
    FetchException,
    FetchGiveUp,
    PageSkip,
    ExtractSkip,
    PageSaved,
    PageException,
}

impl EventKind {
    /// Wire name of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CrawlStart => "crawl.start",
            Self::Progress => "progress",
            Self::CrawlComplete => "crawl.complete",
            Self::CrawlStopped => "crawl.stopped",
            Self::CrawlError => "crawl.error",
            Self::SiteBegin => "site.begin",
            Self::SiteLinks => "site.links",
            Self::SiteComplete => "site.complete",
            Self::SiteError => "site.error",
            Self::SiteSkip => "site.skip",
            Self::SiteException => "site.exception",
            Self::RobotsDisallow => "robots.disallow",
            Self::RobotsMetaSkip => "robots.meta-skip",
            Self::FetchBackoff => "fetch.backoff",
            Self::FetchError => "fetch.error",
            Self::FetchException => "fetch.exception",
            Self::FetchGiveUp => "fetch.giveup",
            Self::PageSkip => "page.skip",
            Self::ExtractSkip => "extract.skip",
            Self::PageSaved => "page.saved",
            Self::PageException => "page.exception",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One published crawl event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlEvent {
    #[serde(rename = "type")]
    pub kind: String,

    pub task_id: Option<String>,

    pub timestamp: String,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl CrawlEvent {
    /// Creates an event stamped with the current time
    pub fn new(kind: EventKind, task_id: Option<&str>) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            task_id: task_id.map(str::to_string),
            timestamp: now_timestamp(),
            payload: Map::new(),
        }
    }

    /// Adds a payload entry
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }

    /// Returns true if this event is of the given kind
    pub fn is(&self, kind: EventKind) -> bool {
        self.kind == kind.as_str()
    }

    /// Looks up a payload entry
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Looks up a string payload entry
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Serializes the event as a single JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"type\":\"{}\"}}", self.kind))
    }
}
