//! Crawl engine: request queue, bounded concurrency and retries
//!
//! Fetches run concurrently on a `JoinSet`; every completed fetch is handed
//! to the [`PageHandler`] on the engine's own task, one page at a time. The
//! handler is therefore the only writer of crawl state and needs no locking.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{FetchError, FetchedPage, PageFetcher};
use crate::crawler::request::CrawlRequest;
use crate::ExtractionError;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;

/// Why a request ended up on the failure path
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CrawlFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl CrawlFailure {
    pub fn is_retryable(&self) -> bool {
        match self {
            CrawlFailure::Fetch(error) => error.is_retryable(),
            CrawlFailure::Extraction(_) => true,
        }
    }
}

/// Receives the outcome of every request
pub trait PageHandler {
    /// Handles a fetched page, returning follow-up requests to enqueue
    ///
    /// An error sends the request back through the retry path.
    fn handle(
        &mut self,
        page: &FetchedPage,
        request: &CrawlRequest,
    ) -> Result<Vec<CrawlRequest>, ExtractionError>;

    /// Called once for a request that failed for good
    fn on_failure(&mut self, request: &CrawlRequest, failure: &CrawlFailure);
}

/// Limits applied by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub max_concurrency: usize,
    /// Ceiling on accepted requests; retries do not count against it
    pub max_requests: usize,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl From<&CrawlerConfig> for EngineSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1) as usize,
            max_requests: config.max_requests_per_crawl as usize,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }
}

/// Request counts for one engine run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Pages fetched and handled
    pub succeeded: usize,
    /// Requests that exhausted their retries or could not be retried
    pub failed: usize,
    /// Retry attempts scheduled
    pub retried: usize,
    /// Requests refused because the budget was spent
    pub rejected: usize,
}

type FetchOutcome = (CrawlRequest, Result<FetchedPage, FetchError>);

pub struct CrawlEngine {
    fetcher: Arc<dyn PageFetcher>,
    settings: EngineSettings,
    queue: VecDeque<CrawlRequest>,
    accepted: usize,
    stats: EngineStats,
}

impl CrawlEngine {
    pub fn new(fetcher: Arc<dyn PageFetcher>, settings: EngineSettings) -> Self {
        Self {
            fetcher,
            settings,
            queue: VecDeque::new(),
            accepted: 0,
            stats: EngineStats::default(),
        }
    }

    /// Adds a request to the back of the queue
    ///
    /// # Returns
    ///
    /// * `true` - The request was accepted
    /// * `false` - The request budget is spent; the request was dropped
    pub fn enqueue(&mut self, request: CrawlRequest) -> bool {
        if self.accepted >= self.settings.max_requests {
            tracing::debug!("Request budget reached, dropping {}", request.url);
            self.stats.rejected += 1;
            return false;
        }

        self.accepted += 1;
        self.queue.push_back(request);
        true
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Drains the queue, delivering every outcome to `handler`
    ///
    /// Returns once nothing is queued and nothing is in flight. Follow-up
    /// requests returned by the handler are enqueued under the same budget.
    pub async fn run<H: PageHandler>(&mut self, handler: &mut H) -> EngineStats {
        let mut in_flight: JoinSet<FetchOutcome> = JoinSet::new();

        loop {
            while in_flight.len() < self.settings.max_concurrency {
                match self.queue.pop_front() {
                    Some(request) => self.spawn_fetch(&mut in_flight, request),
                    None => break,
                }
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            let (request, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Fetch task aborted: {}", e);
                    self.stats.failed += 1;
                    continue;
                }
            };

            match result {
                Ok(page) => match handler.handle(&page, &request) {
                    Ok(follow_ups) => {
                        self.stats.succeeded += 1;
                        for follow_up in follow_ups {
                            self.enqueue(follow_up);
                        }
                    }
                    Err(e) => self.retry_or_fail(handler, request, e.into()),
                },
                Err(e) => self.retry_or_fail(handler, request, e.into()),
            }
        }

        tracing::debug!(
            "Engine drained: {} succeeded, {} failed, {} retried, {} rejected",
            self.stats.succeeded,
            self.stats.failed,
            self.stats.retried,
            self.stats.rejected
        );
        self.stats
    }

    fn spawn_fetch(&self, in_flight: &mut JoinSet<FetchOutcome>, request: CrawlRequest) {
        let fetcher = Arc::clone(&self.fetcher);
        let timeout = self.settings.request_timeout;
        let delay = if request.retry_count > 0 {
            self.settings.retry_delay
        } else {
            Duration::ZERO
        };

        tracing::debug!("Fetching {} (attempt {})", request.url, request.retry_count + 1);

        in_flight.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            // A panicking fetcher surfaces as a network failure of this request
            let url = request.url.clone();
            let mut fetch = tokio::spawn(async move { fetcher.fetch(&url).await });
            let result = match tokio::time::timeout(timeout, &mut fetch).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(FetchError::Network {
                    url: request.url.to_string(),
                    message: format!("fetch task failed: {}", e),
                }),
                Err(_) => {
                    fetch.abort();
                    Err(FetchError::Timeout {
                        url: request.url.to_string(),
                    })
                }
            };

            (request, result)
        });
    }

    fn retry_or_fail<H: PageHandler>(
        &mut self,
        handler: &mut H,
        request: CrawlRequest,
        failure: CrawlFailure,
    ) {
        if failure.is_retryable() && request.retry_count < self.settings.max_retries {
            tracing::warn!(
                "Retrying {} ({}/{}): {}",
                request.url,
                request.retry_count + 1,
                self.settings.max_retries,
                failure
            );
            self.stats.retried += 1;
            self.queue.push_back(request.retry());
            return;
        }

        tracing::error!("Giving up on {}: {}", request.url, failure);
        self.stats.failed += 1;
        handler.on_failure(&request, &failure);
    }
}
