//! Crawl progress counters
//!
//! The tracker owns the counters and the failure log. After every mutation it
//! hands an immutable snapshot to the observer, synchronously, before
//! returning to the caller.

use serde::Serialize;
use std::sync::Arc;

/// Counters describing how far the crawl has come
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlProgress {
    pub total_categories: usize,
    pub processed_categories: usize,
    pub total_subcategories: usize,
    /// URLs whose requests failed for good, in failure order
    pub failed_requests: Vec<String>,
}

/// Receives a snapshot after every progress mutation
///
/// Called on the page-handling path; implementations must return quickly.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &CrawlProgress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&CrawlProgress) + Send + Sync,
{
    fn on_progress(&self, progress: &CrawlProgress) {
        self(progress)
    }
}

/// Logs every snapshot at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ProgressObserver for LoggingObserver {
    fn on_progress(&self, progress: &CrawlProgress) {
        tracing::info!(
            "Progress: {}/{} categories processed, {} subcategories, {} failed",
            progress.processed_categories,
            progress.total_categories,
            progress.total_subcategories,
            progress.failed_requests.len()
        );
    }
}

#[derive(Default)]
pub struct ProgressTracker {
    progress: CrawlProgress,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observer(observer: Arc<dyn ProgressObserver>) -> Self {
        Self {
            progress: CrawlProgress::default(),
            observer: Some(observer),
        }
    }

    pub fn snapshot(&self) -> CrawlProgress {
        self.progress.clone()
    }

    pub fn progress(&self) -> &CrawlProgress {
        &self.progress
    }

    /// Adds the categories stored from one main page
    pub fn add_categories(&mut self, count: usize) {
        self.progress.total_categories += count;
        self.notify();
    }

    pub fn add_subcategories(&mut self, count: usize) {
        self.progress.total_subcategories += count;
        self.notify();
    }

    /// Counts one finished category page
    pub fn mark_category_processed(&mut self) {
        self.progress.processed_categories += 1;
        self.notify();
    }

    pub fn record_failure(&mut self, url: &str) {
        self.progress.failed_requests.push(url.to_string());
        self.notify();
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer.on_progress(&self.progress);
        }
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("progress", &self.progress)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
