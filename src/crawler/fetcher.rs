//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building a blocking HTTP client with timeout, redirect and user agent settings
//! - GET requests to fetch page content
//! - Error classification
//!
//! Failures are reported as `FetchResult` variants and never as errors, so a
//! bad page can only ever abandon its own task.

use crate::config::FetcherConfig;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, redirect loop, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Whether the fetch produced a body worth parsing
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Source of page bodies
///
/// Implementations must be callable from many worker threads at once.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> FetchResult;
}

/// Builds a blocking HTTP client with the configured settings
///
/// # Example
///
/// ```no_run
/// use ripple_crawl::config::FetcherConfig;
/// use ripple_crawl::crawler::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs))
        .redirect(Policy::limited(config.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a shared blocking `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> FetchResult {
        fetch_url(&self.client, url)
    }
}

/// Fetches a URL and classifies the outcome
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | Success (body read as text) |
/// | Any other status after redirects | HttpError |
/// | Timeout | NetworkError |
/// | Connection refused / TLS failure | NetworkError |
/// | Redirect limit exceeded | NetworkError |
/// | Body read failure | NetworkError |
pub fn fetch_url(client: &Client, url: &str) -> FetchResult {
    match client.get(url).send() {
        Ok(response) => {
            let status = response.status();
            let final_url = response.url().to_string();

            if !status.is_success() {
                return FetchResult::HttpError {
                    status_code: status.as_u16(),
                };
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            match response.text() {
                Ok(body) => FetchResult::Success {
                    final_url,
                    status_code: status.as_u16(),
                    content_type,
                    body,
                },
                Err(e) => FetchResult::NetworkError {
                    error: e.to_string(),
                },
            }
        }
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection failed".to_string()
            } else if e.is_redirect() {
                "Too many redirects".to_string()
            } else {
                e.to_string()
            };
            FetchResult::NetworkError { error }
        }
    }
}
