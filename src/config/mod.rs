//! Configuration module
//!
//! Configuration is built once at startup from the built-in defaults, an
//! optional TOML file, and environment overrides.
//!
//! # Example
//!
//! ```no_run
//! use knowledge_crawler::config::load_runtime_config;
//!
//! let (config, _hash) = load_runtime_config(None).unwrap();
//! println!("Minimum delay: {}s", config.crawler.min_delay_secs);
//! ```

mod env;
mod parser;
mod types;
mod validation;

pub use types::{
    default_topics, Config, CrawlerConfig, OutputConfig, TopicEntry, DEFAULT_TARGETS,
};

pub use env::apply_env_overrides;
pub use parser::{compute_config_hash, load_config, load_runtime_config};
pub use validation::validate;
