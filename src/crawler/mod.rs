//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and backoff
//! - Seed page parsing and link extraction
//! - Politeness delays
//! - The page gate deciding what becomes an article
//! - Task orchestration across the seed sites

mod coordinator;
mod fetcher;
mod gate;
mod limiter;
mod parser;

pub use coordinator::{CrawlerStatus, Orchestrator, SiteOutcome, SiteReport};
pub use fetcher::{
    build_http_client, FetchOutcome, FetchedPage, Fetcher, RetryPolicy, MAX_REDIRECTS,
};
pub use gate::{
    AcceptedPage, PageGate, SkipReason, ACCEPTED_LANGUAGE, MAX_CONTENT_LENGTH, MIN_TEXT_CHARS,
};
pub use limiter::{pause, RateLimiter, MAX_JITTER_SECS};
pub use parser::{candidate_links, extract_title, parse_html, ParsedPage};
