//! Politeness delays
//!
//! Every link waits `max(min_delay, crawl_delay) + jitter` before its fetch.
//! The wait is per link, so with `N` links in flight a host sees at most
//! roughly `N / delay` requests per second.

use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper bound of the random jitter added to every delay (seconds)
pub const MAX_JITTER_SECS: f64 = 0.5;

/// Computes politeness delays from the configured minimum and robots.txt
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    min_delay: Duration,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self { min_delay }
    }

    /// Creates a limiter from a delay in seconds; invalid values mean no delay
    pub fn from_secs_f64(min_delay_secs: f64) -> Self {
        Self::new(Duration::try_from_secs_f64(min_delay_secs).unwrap_or_default())
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// The delay before jitter: the larger of the minimum and the crawl delay
    ///
    /// A negative or non-finite crawl delay is ignored.
    pub fn base_delay(&self, crawl_delay_secs: Option<f64>) -> Duration {
        let robots_delay = crawl_delay_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_default();

        std::cmp::max(self.min_delay, robots_delay)
    }

    /// The full delay before the next fetch, jitter included
    pub fn delay_before_next_fetch(&self, crawl_delay_secs: Option<f64>) -> Duration {
        let jitter = rand::rng().random_range(0.0..MAX_JITTER_SECS);
        self.base_delay(crawl_delay_secs) + Duration::from_secs_f64(jitter)
    }
}

/// Sleeps for `delay` unless `cancel` fires first
///
/// Returns false when the sleep was cut short by cancellation.
pub async fn pause(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }

    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
