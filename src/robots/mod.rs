//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files. Fetching fails open; rule evaluation fails closed.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::RobotsPolicy;

use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// Fetches robots.txt for the host of `site_url`
///
/// Any transport error or non-success status yields an allow-all policy.
pub async fn fetch_robots(client: &Client, site_url: &Url) -> RobotsPolicy {
    let robots_url = match site_url.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            warn!("Cannot build robots.txt URL for {}: {}", site_url, e);
            return RobotsPolicy::allow_all();
        }
    };

    let response = match client.get(robots_url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("Failed to fetch {}: {}", robots_url, e);
            return RobotsPolicy::allow_all();
        }
    };

    if !response.status().is_success() {
        debug!(
            "robots.txt at {} returned {}, allowing all",
            robots_url,
            response.status()
        );
        return RobotsPolicy::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            debug!("Fetched robots.txt from {} ({} bytes)", robots_url, body.len());
            RobotsPolicy::from_content(&body)
        }
        Err(e) => {
            warn!("Failed to read robots.txt body from {}: {}", robots_url, e);
            RobotsPolicy::allow_all()
        }
    }
}

/// Returns the product token of a User-Agent string
///
/// The token is everything before the first `/` or whitespace, which is what
/// robots.txt `User-agent` lines are matched against.
///
/// # Examples
///
/// ```
/// use knowledge_crawler::robots::product_token;
///
/// assert_eq!(product_token("Googlebot/2.1 (+http://www.google.com/bot.html)"), "Googlebot");
/// assert_eq!(product_token("ServerAI Knowledge Engine Bot 1.0"), "ServerAI");
/// ```
pub fn product_token(user_agent: &str) -> String {
    user_agent
        .trim()
        .split(|c: char| c == '/' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_string()
}
