//! Per-host robots.txt cache
//!
//! Policies are fetched lazily on first use and kept for the lifetime of the
//! cache; there is no expiry.

use crate::robots::{fetch_robots, product_token, RobotsPolicy};
use crate::url::host_key;
use dashmap::DashMap;
use reqwest::Client;
use std::sync::Arc;
use url::Url;

/// Robots.txt policies keyed by `host[:port]`
#[derive(Debug)]
pub struct RobotsCache {
    entries: DashMap<String, Arc<RobotsPolicy>>,
    agent: String,
    enabled: bool,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// `user_agent` is the full User-Agent header; rules are matched against
    /// its product token. With `enabled` false, every query answers as if no
    /// robots.txt existed and nothing is fetched.
    pub fn new(user_agent: &str, enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            agent: product_token(user_agent),
            enabled,
        }
    }

    /// Returns the robots.txt product token rules are matched against
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Returns whether robots.txt compliance is on
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the policy for the host of `site_url`, fetching it on a miss
    ///
    /// Returns `None` when compliance is disabled. When two callers miss at
    /// once, both fetch, and the first inserted policy is the one kept.
    pub async fn get_policy(&self, client: &Client, site_url: &Url) -> Option<Arc<RobotsPolicy>> {
        if !self.enabled {
            return None;
        }

        // No key means no host; an allow-all policy keeps callers uniform
        let Some(key) = host_key(site_url) else {
            return Some(Arc::new(RobotsPolicy::allow_all()));
        };

        if let Some(existing) = self.entries.get(&key) {
            return Some(Arc::clone(existing.value()));
        }

        let fetched = Arc::new(fetch_robots(client, site_url).await);
        let entry = self.entries.entry(key).or_insert(fetched);
        Some(Arc::clone(entry.value()))
    }

    /// Checks whether `url` may be fetched under `policy`
    pub fn allowed(&self, policy: Option<&RobotsPolicy>, url: &Url) -> bool {
        match policy {
            None => true,
            Some(policy) => policy.is_allowed(url.as_str(), &self.agent),
        }
    }

    /// Returns the crawl-delay (seconds) `policy` asks of this agent
    pub fn crawl_delay(&self, policy: Option<&RobotsPolicy>) -> Option<f64> {
        policy.and_then(|p| p.crawl_delay(&self.agent))
    }

    /// Number of hosts with a cached policy
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
