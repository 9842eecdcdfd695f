//! HTTP fetcher implementation
//!
//! This module handles the HTTP side of the crawl:
//! - Building reqwest clients with the configured user agent and timeout
//! - Rotating through a proxy pool, one client per proxy
//! - Classifying responses into pages or retryable/terminal failures

use crate::config::{CrawlerConfig, ProxyConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,
    pub status: u16,
    pub body: String,
}

/// Failure of a single fetch attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("Not an HTML page ({content_type}): {url}")]
    ContentMismatch { url: String, content_type: String },
}

impl FetchError {
    /// Whether another attempt could succeed
    ///
    /// Gone pages and non-HTML responses will not change on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => *status != 404 && *status != 410,
            FetchError::ContentMismatch { .. } => false,
            FetchError::Network { .. } | FetchError::Timeout { .. } => true,
        }
    }
}

/// Capability to fetch one page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Whole-request timeout
/// * `proxy` - Optional proxy URL all requests go through
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use shelf_mapper::config::UserAgentConfig;
/// use shelf_mapper::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig::default();
/// let client = build_http_client(&config, Duration::from_secs(30), None).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
    proxy: Option<&str>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }

    builder.build()
}

/// reqwest-backed fetcher, round-robin over a proxy pool
pub struct HttpFetcher {
    clients: Vec<Client>,
    next_client: AtomicUsize,
}

impl HttpFetcher {
    /// Creates a fetcher with one client per configured proxy
    ///
    /// Without proxies a single direct client is used.
    pub fn new(
        user_agent: &UserAgentConfig,
        crawler: &CrawlerConfig,
        proxy: &ProxyConfig,
    ) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(crawler.request_timeout_secs);

        let clients = if proxy.urls.is_empty() {
            vec![build_http_client(user_agent, timeout, None)?]
        } else {
            proxy
                .urls
                .iter()
                .map(|url| build_http_client(user_agent, timeout, Some(url)))
                .collect::<Result<Vec<_>, _>>()?
        };

        tracing::debug!("HTTP fetcher ready with {} client(s)", clients.len());

        Ok(Self {
            clients,
            next_client: AtomicUsize::new(0),
        })
    }

    fn client(&self) -> &Client {
        let index = self.next_client.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client()
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return Err(FetchError::ContentMismatch {
                url: url.to_string(),
                content_type,
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }
}

/// Missing content types are accepted; shops rarely omit them for HTML
fn is_html(content_type: &str) -> bool {
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}

fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status().filter(|s| *s != StatusCode::OK) {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
