use crate::config::types::{Config, CrawlerConfig, OutputConfig, TopicEntry};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_targets(&config.targets)?;
    validate_topics(&config.topics)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if !config.min_delay_secs.is_finite() || config.min_delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "min_delay_secs must be a non-negative number, got {}",
            config.min_delay_secs
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_links_per_site < 1 {
        return Err(ConfigError::Validation(format!(
            "max_links_per_site must be >= 1, got {}",
            config.max_links_per_site
        )));
    }

    if config.max_concurrent_links < 1 || config.max_concurrent_links > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_links must be between 1 and 100, got {}",
            config.max_concurrent_links
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.export_markdown && config.storage_path.is_empty() {
        return Err(ConfigError::Validation(
            "storage_path cannot be empty when markdown export is enabled".to_string(),
        ));
    }

    Ok(())
}

/// Validates the seed site list
fn validate_targets(targets: &[String]) -> Result<(), ConfigError> {
    for target in targets {
        let url = Url::parse(target).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid target URL '{}': {}", target, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::Validation(format!(
                "Target URL '{}' must use http or https",
                target
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Target URL '{}' has no host",
                target
            )));
        }
    }

    Ok(())
}

/// Validates the topic table
fn validate_topics(topics: &[TopicEntry]) -> Result<(), ConfigError> {
    if topics.is_empty() {
        return Err(ConfigError::Validation(
            "at least one topic must be configured".to_string(),
        ));
    }

    for (i, topic) in topics.iter().enumerate() {
        if topic.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "topic name cannot be empty".to_string(),
            ));
        }

        if topics[..i].iter().any(|other| other.name == topic.name) {
            return Err(ConfigError::Validation(format!(
                "topic '{}' is declared more than once",
                topic.name
            )));
        }

        if topic.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "topic '{}' must have at least one keyword",
                topic.name
            )));
        }
    }

    Ok(())
}
