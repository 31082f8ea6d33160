//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the identity headers the target sites expect
//! - GET requests with a fixed delay between attempts
//! - Reporting exhausted retries as `Unreachable`
//!
//! There is no caching; every call performs a live request. The session
//! only sees the [`PageSource`] trait, which the fetcher implements.

use crate::config::FetcherConfig;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors reported by the fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt failed with a transport error or a non-2xx status
    #[error("{url} unreachable after {attempts} attempt(s): {last_error}")]
    Unreachable {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// A configured header value is not valid HTTP
    #[error("Invalid header value for {name}: {value}")]
    InvalidHeader { name: &'static str, value: String },
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects; relative links resolve against it
    pub url: Url,
    /// Response body as text
    pub body: String,
}

/// Where the crawler reads listing and detail pages from
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches a page; an error means the page is skipped
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

/// Builds an HTTP client with the configured identity headers
///
/// # Example
///
/// ```no_run
/// use asset_harvester::config::FetcherConfig;
/// use asset_harvester::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    if let Some(referer) = &config.referer {
        let value = HeaderValue::from_str(referer).map_err(|_| FetchError::InvalidHeader {
            name: "Referer",
            value: referer.clone(),
        })?;
        headers.insert(REFERER, value);
    }

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}

/// Issues GET requests with bounded retry
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl Fetcher {
    /// Creates a fetcher from configuration
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(config)?,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    /// Fetches a URL
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return the page |
    /// | Any other status | Wait the retry delay, try again |
    /// | Transport error (timeout, refused, TLS) | Wait the retry delay, try again |
    /// | Attempts exhausted | `FetchError::Unreachable` |
    ///
    /// `Unreachable` is not fatal; the caller decides whether to skip or stop.
    pub async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.try_fetch(url).await {
                Ok(page) => return Ok(page),
                Err(error) => {
                    tracing::warn!(
                        "{} failed: {} (attempt {}/{})",
                        url,
                        error,
                        attempt,
                        self.max_attempts
                    );
                    last_error = error;
                }
            }

            if attempt < self.max_attempts && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(FetchError::Unreachable {
            url: url.to_string(),
            attempts: self.max_attempts,
            last_error,
        })
    }

    /// Performs a single attempt, flattening every failure into a message
    async fn try_fetch(&self, url: &Url) -> Result<Page, String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(describe_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status.as_u16()));
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| e.to_string())?;

        Ok(Page {
            url: final_url,
            body,
        })
    }
}

#[async_trait::async_trait]
impl PageSource for Fetcher {
    async fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        Fetcher::fetch(self, url).await
    }
}

fn describe_transport_error(error: reqwest::Error) -> String {
    if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        format!("Connection failed: {}", error)
    } else {
        error.to_string()
    }
}
