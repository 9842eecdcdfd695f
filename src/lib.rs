//! Shelf-Mapper: catalog hierarchy discovery for e-commerce sites
//!
//! This crate crawls the listing pages of a shop, extracts its categories and
//! their subcategories, and reassembles the flat records into a category tree.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod records;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Shelf-Mapper operations
#[derive(Debug, Error)]
pub enum ShelfError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Usage error: {0}")]
    Usage(String),
}

/// A page could not be turned into records
///
/// This is the single failure the dispatcher hands back to the crawl engine,
/// which decides whether the request is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to extract records from {url}: {message}")]
pub struct ExtractionError {
    pub url: String,
    pub message: String,
}

impl ExtractionError {
    pub fn new(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector in config: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Shelf-Mapper operations
pub type Result<T> = std::result::Result<T, ShelfError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlMode, CrawlRequest, Orchestrator, RequestTag};
pub use extract::{Extractor, Page, SelectorExtractor};
pub use records::{build_tree, Category, CategoryTree, Subcategory};
pub use state::{CategoryStore, CrawlProgress, ProgressTracker, SubcategoryStore};
