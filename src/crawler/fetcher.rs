//! HTTP fetcher implementation
//!
//! This module defines the fetch capability the crawl tasks consume and its
//! reqwest-backed implementation:
//! - Building the HTTP client with the configured user agent and referrer
//! - GET requests with a whole-request timeout
//! - Classifying failures into non-fatal [`FetchError`]s

use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, REFERER};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for one page
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Address the body was served from, after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Page body content
    pub content: String,
}

/// Per-page fetch failure
///
/// Never fatal to a crawl: the page is recorded as failed and the crawl does
/// not recurse from it.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// No response (connection refused, DNS failure, timeout, TLS error)
    #[error("request failed: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("HTTP {0}")]
    Status(u16),

    /// The response is not an HTML document
    #[error("unsupported content type '{content_type}'")]
    UnsupportedContent {
        status_code: u16,
        content_type: String,
    },

    /// The body could not be read or decoded
    #[error("failed to read body: {message}")]
    Body { status_code: u16, message: String },
}

impl FetchError {
    /// The HTTP status received before the failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Network(_) => None,
            Self::Status(code) => Some(*code),
            Self::UnsupportedContent { status_code, .. } | Self::Body { status_code, .. } => {
                Some(*status_code)
            }
        }
    }
}

/// Capability to fetch one page
///
/// Implementations must be safe to call concurrently from many crawl tasks.
#[async_trait]
pub trait FetchClient: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use site_indexer::config::FetchConfig;
/// use site_indexer::crawler::build_http_client;
///
/// let config = FetchConfig {
///     user_agent: "SiteIndexer/1.0".to_string(),
///     referrer: Some("https://www.google.com".to_string()),
///     timeout_secs: 30,
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if let Some(referrer) = config
        .referrer
        .as_deref()
        .and_then(|r| HeaderValue::from_str(r).ok())
    {
        headers.insert(REFERER, referrer);
    }

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`FetchClient`]
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl FetchClient for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        let final_url = response.url().clone();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return Err(FetchError::UnsupportedContent {
                status_code: status.as_u16(),
                content_type,
            });
        }

        let content = response.text().await.map_err(|e| FetchError::Body {
            status_code: status.as_u16(),
            message: e.to_string(),
        })?;

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            content,
        })
    }
}

fn classify_request_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Network("Request timeout".to_string())
    } else if e.is_connect() {
        FetchError::Network("Connection refused".to_string())
    } else if e.is_redirect() {
        FetchError::Network("Too many redirects".to_string())
    } else {
        FetchError::Network(e.to_string())
    }
}

/// A missing Content-Type is accepted as HTML
fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml"
}
