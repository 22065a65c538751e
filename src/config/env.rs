//! Environment overrides, read once at startup

use crate::config::types::Config;
use crate::ConfigError;
use std::str::FromStr;

/// Applies environment overrides to a configuration
///
/// `lookup` resolves a variable name to its value; the binary passes
/// `std::env::var`, tests pass a map.
///
/// | Variable | Field |
/// |----------|-------|
/// | `STORAGE_PATH` | `output.storage-path` |
/// | `DATABASE_PATH` | `output.database-path` |
/// | `CRAWLER_USER_AGENT` | `crawler.user-agent` |
/// | `CRAWLER_DELAY` | `crawler.min-delay-secs` |
/// | `CRAWLER_TIMEOUT` | `crawler.timeout-secs` |
/// | `CRAWLER_RESPECT_ROBOTS` | `crawler.respect-robots` (`true` enables) |
/// | `CRAWLER_MAX_PAGES` | `crawler.max-links-per-site` |
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup("STORAGE_PATH") {
        config.output.storage_path = path;
    }
    if let Some(path) = lookup("DATABASE_PATH") {
        config.output.database_path = path;
    }
    if let Some(agent) = lookup("CRAWLER_USER_AGENT") {
        config.crawler.user_agent = agent;
    }
    if let Some(delay) = lookup("CRAWLER_DELAY") {
        config.crawler.min_delay_secs = parse_var("CRAWLER_DELAY", &delay)?;
    }
    if let Some(timeout) = lookup("CRAWLER_TIMEOUT") {
        config.crawler.timeout_secs = parse_var("CRAWLER_TIMEOUT", &timeout)?;
    }
    if let Some(respect) = lookup("CRAWLER_RESPECT_ROBOTS") {
        config.crawler.respect_robots = respect.trim().eq_ignore_ascii_case("true");
    }
    if let Some(max) = lookup("CRAWLER_MAX_PAGES") {
        config.crawler.max_links_per_site = parse_var("CRAWLER_MAX_PAGES", &max)?;
    }
    Ok(())
}

fn parse_var<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var: var.to_string(),
        message: format!("'{}': {}", value, e),
    })
}
