//! Configuration module for Shelf-Mapper
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional, so an empty file (or no file at all) yields a
//! working default configuration.
//!
//! # Example
//!
//! ```no_run
//! use shelf_mapper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shelf-mapper.toml")).unwrap();
//! println!("Crawler will use {} workers", config.crawler.max_concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, ExtractionConfig, OutputConfig, OutputFormat, ProxyConfig,
    SelectorConfig, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
