//! HTTP fetcher implementation
//!
//! This module handles all network access for the crawler:
//! - The `Fetcher` capability the downloader depends on
//! - Building the reqwest client with the configured user agent and timeouts
//! - Mapping transport failures and error statuses onto `MirrorError`
//!
//! There is no retry logic. A failed fetch is reported once and the crawl
//! policy decides what happens next.

use crate::config::{FetchConfig, UserAgentConfig};
use crate::MirrorError;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// A successfully fetched response body
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Raw response body
    pub body: Vec<u8>,
    /// Content-Type header value, empty if the server sent none
    pub content_type: String,
    /// HTTP status code
    pub status: u16,
    /// URL after redirects
    pub final_url: Url,
}

/// Something that can retrieve the body of a URL
///
/// The crawler only ever talks to the network through this trait, so tests
/// can substitute an in-memory site.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, failing on transport errors and on any status >= 400
    async fn fetch(&self, url: &Url) -> Result<Fetched, MirrorError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `fetch` - Timeouts and redirect limit
/// * `user_agent` - The user agent identification
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use site_mirror::config::{FetchConfig, UserAgentConfig};
/// use site_mirror::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default(), &UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    fetch: &FetchConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(fetch.request_timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .redirect(Policy::limited(fetch.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from configuration
    pub fn from_config(
        fetch: &FetchConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(fetch, user_agent)?))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<Fetched, MirrorError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(MirrorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(url, &e))?;

        tracing::debug!(
            "Fetched {} ({} {}, {} bytes)",
            url,
            status.as_u16(),
            content_type,
            body.len()
        );

        Ok(Fetched {
            body: body.to_vec(),
            content_type,
            status: status.as_u16(),
            final_url,
        })
    }
}

/// Classifies a reqwest failure into a fetch error with a short message
fn transport_error(url: &Url, error: &reqwest::Error) -> MirrorError {
    let message = if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else if error.is_redirect() {
        "too many redirects".to_string()
    } else {
        error.to_string()
    };

    MirrorError::Fetch {
        url: url.to_string(),
        message,
    }
}
