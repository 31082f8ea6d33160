//! Configuration module for Asset-Harvester
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use asset_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawler will visit at most {} pages", config.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    BucketLayoutKind, Config, CrawlConfig, FetcherConfig, HostRuleEntry, SiteConfig, SitePreset,
    StoreConfig, TargetEntry, DEFAULT_USER_AGENT,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
