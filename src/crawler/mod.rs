//! Crawler module for page fetching and dispatch
//!
//! This module contains the core crawling logic, including:
//! - Tagged crawl requests (main pages and category pages)
//! - HTTP fetching through a proxy-aware reqwest client
//! - The crawl engine: queue, bounded concurrency, retries and request budget
//! - The dispatcher routing fetched pages to extraction and the stores
//! - Overall crawl orchestration and run-end export

mod coordinator;
mod dispatcher;
mod engine;
mod fetcher;
mod request;

pub use coordinator::{export_outcome, run_crawl, CrawlMode, CrawlOutcome, Orchestrator};
pub use dispatcher::{DispatchOptions, Dispatcher};
pub use engine::{CrawlEngine, CrawlFailure, EngineSettings, EngineStats, PageHandler};
pub use fetcher::{build_http_client, FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use request::{CrawlRequest, RequestTag};
