//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with the crawler's user agent
//! - GET requests for seed pages (single attempt)
//! - GET requests for linked pages with retry and exponential backoff
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 429 / 403 | `fetch.backoff`, sleep, double the backoff, retry |
//! | Transport error | `fetch.exception`, sleep, double the backoff, retry |
//! | Other HTTP >= 400 | `fetch.error`, no retry |
//! | Attempts exhausted | `fetch.giveup` |
//!
//! No sleep follows the final attempt. A stop request is honoured before
//! each attempt and during backoff; a request already sent runs to its end.
//!
//! # Body Limits
//!
//! Bodies of error responses and non-HTML pages are never read. HTML bodies
//! are streamed and abandoned once the decoded size passes
//! [`MAX_CONTENT_LENGTH`], so compressed responses are capped as well.

use crate::config::CrawlerConfig;
use crate::crawler::gate::MAX_CONTENT_LENGTH;
use crate::crawler::limiter::pause;
use crate::events::{EventKind, EventReporter};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE,
};
use reqwest::{redirect::Policy, Client, Response, StatusCode};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Maximum redirect hops followed per request
pub const MAX_REDIRECTS: usize = 10;

/// Builds the HTTP client shared by every request of a task
///
/// # Example
///
/// ```no_run
/// use knowledge_crawler::config::CrawlerConfig;
/// use knowledge_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// How often and how patiently a page fetch is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,

    /// Sleep after the first failed attempt
    pub initial_backoff: Duration,

    /// Multiplier applied to the backoff after every sleep
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            factor: 2,
        }
    }
}

impl RetryPolicy {
    /// Sleep that follows the failed attempt number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.initial_backoff
            .saturating_mul(self.factor.saturating_pow(exponent))
    }
}

/// A response whose body has been read
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,

    pub status: u16,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Content-Length header value, when present and numeric
    ///
    /// reqwest drops the header from responses it decompresses.
    pub content_length: Option<u64>,

    /// The body passed [`MAX_CONTENT_LENGTH`] and was not kept
    pub oversized: bool,

    /// Empty unless the page is HTML and within the size limit
    pub body: String,
}

impl FetchedPage {
    /// Returns true if the Content-Type announces HTML
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    /// Returns true if the page is announced or known to be larger than
    /// [`MAX_CONTENT_LENGTH`]
    pub fn exceeds_limit(&self) -> bool {
        self.oversized
            || self
                .content_length
                .is_some_and(|length| length > MAX_CONTENT_LENGTH)
    }
}

/// Result of a fetch with retry
#[derive(Debug)]
pub enum FetchOutcome {
    /// A page with a status below 400
    Page(FetchedPage),

    /// A non-retryable HTTP error
    HttpError { status: u16 },

    /// Every attempt was rate limited or failed in transport
    GaveUp {
        attempts: u32,
        /// Status of the last attempt; `None` when it failed in transport
        last_status: Option<u16>,
    },

    /// The task was stopped before an attempt or during backoff
    Cancelled,
}

enum Attempt {
    Page(FetchedPage),
    Status(StatusCode),
}

/// Fetches pages with the task's client
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches a URL once, whatever its status
    pub async fn fetch_once(&self, url: &Url) -> Result<FetchedPage, reqwest::Error> {
        let response = self.client.get(url.clone()).send().await?;
        read_page(response).await
    }

    /// Fetches a URL, retrying rate limits and transport errors
    ///
    /// Failures are reported through `reporter` and folded into the outcome;
    /// this never returns an error.
    pub async fn fetch(
        &self,
        url: &Url,
        reporter: &EventReporter,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_status = None;

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                return FetchOutcome::Cancelled;
            }

            match self.attempt(url).await {
                Ok(Attempt::Page(page)) => {
                    debug!("Fetched {} ({})", url, page.status);
                    return FetchOutcome::Page(page);
                }
                Ok(Attempt::Status(status)) if is_retryable(status) => {
                    last_status = Some(status.as_u16());
                }
                Ok(Attempt::Status(status)) => {
                    warn!("HTTP {} for {}", status.as_u16(), url);
                    reporter.publish(
                        reporter
                            .event(EventKind::FetchError)
                            .with("url", url.as_str())
                            .with("status", status.as_u16()),
                    );
                    return FetchOutcome::HttpError {
                        status: status.as_u16(),
                    };
                }
                Err(e) => {
                    warn!("Request to {} failed (attempt {}): {}", url, attempt, e);
                    last_status = None;
                    reporter.publish(
                        reporter
                            .event(EventKind::FetchException)
                            .with("url", url.as_str())
                            .with("attempt", attempt)
                            .with("error", e.to_string()),
                    );
                }
            }

            if attempt == max_attempts {
                break;
            }

            let backoff = self.policy.backoff_for(attempt);
            if let Some(status) = last_status {
                debug!(
                    "HTTP {} for {}, backing off {:?} (attempt {})",
                    status, url, backoff, attempt
                );
                reporter.publish(
                    reporter
                        .event(EventKind::FetchBackoff)
                        .with("url", url.as_str())
                        .with("status", status)
                        .with("attempt", attempt)
                        .with("backoff_secs", backoff.as_secs_f64()),
                );
            }

            if !pause(backoff, cancel).await {
                return FetchOutcome::Cancelled;
            }
        }

        warn!("Giving up on {} after {} attempts", url, max_attempts);
        let mut event = reporter
            .event(EventKind::FetchGiveUp)
            .with("url", url.as_str())
            .with("attempts", max_attempts);
        if let Some(status) = last_status {
            event = event.with("status", status);
        }
        reporter.publish(event);

        FetchOutcome::GaveUp {
            attempts: max_attempts,
            last_status,
        }
    }

    async fn attempt(&self, url: &Url) -> Result<Attempt, reqwest::Error> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status.is_client_error() || status.is_server_error() {
            return Ok(Attempt::Status(status));
        }

        Ok(Attempt::Page(read_page(response).await?))
    }
}

/// 429 and 403 are treated as "slow down"
fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN
}

async fn read_page(mut response: Response) -> Result<FetchedPage, reqwest::Error> {
    let headers = response.headers();
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let content_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok());

    let mut page = FetchedPage {
        url: response.url().clone(),
        status: response.status().as_u16(),
        content_type,
        content_length,
        oversized: false,
        body: String::new(),
    };

    if page.status >= 400 || !page.is_html() {
        return Ok(page);
    }
    if page.exceeds_limit() {
        debug!("{} announces {:?} bytes, not reading it", page.url, page.content_length);
        return Ok(page);
    }

    // Chunks arrive decoded; the limit applies to what the page really weighs
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if (body.len() + chunk.len()) as u64 > MAX_CONTENT_LENGTH {
            debug!("{} passed {} bytes, dropping body", page.url, MAX_CONTENT_LENGTH);
            page.oversized = true;
            return Ok(page);
        }
        body.extend_from_slice(&chunk);
    }

    page.body = String::from_utf8_lossy(&body).into_owned();
    Ok(page)
}
