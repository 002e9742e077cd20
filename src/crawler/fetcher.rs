//! Resource fetching
//!
//! This module handles all transport for the mirror:
//! - Building HTTP clients with the configured user agent and redirect limit
//! - GET requests with per-resource headers and timeouts
//! - Reading `file:` URLs from local disk
//! - Mapping non-2xx responses and transport failures to network errors

use crate::config::Config;
use crate::{MirrorError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use url::Url;

/// Per-request options, adjustable by plugins before each fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Extra headers sent with the request
    pub headers: BTreeMap<String, String>,
    /// Overrides the client timeout when set
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Default options for every request of a crawl
    pub fn from_config(config: &Config) -> Self {
        Self {
            headers: config.request.headers.clone(),
            timeout: None,
        }
    }
}

/// A successful fetch
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// URL the body was served from, after redirects
    pub final_url: Url,
    pub body: Vec<u8>,
    /// Content-Type header value, when the transport provides one
    pub content_type: Option<String>,
    /// Free-form response details (status code, headers of interest)
    pub metadata: HashMap<String, String>,
}

impl FetchResponse {
    pub fn new(final_url: Url, body: impl Into<Vec<u8>>, content_type: Option<&str>) -> Self {
        Self {
            final_url,
            body: body.into(),
            content_type: content_type.map(str::to_string),
            metadata: HashMap::new(),
        }
    }
}

/// Transport used to acquire resource bodies
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`
    ///
    /// Implementations follow redirects themselves and report the final URL.
    /// Any failure, including a non-success status, is a
    /// [`MirrorError::Network`].
    async fn fetch(&self, url: &Url, options: &RequestOptions) -> Result<FetchResponse>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawl configuration (user agent, timeout, redirect limit)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.header_value())
        .timeout(Duration::from_secs(config.request.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(config.request.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by `reqwest`, with a local-disk fallback for `file:` URLs
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(config)
            .map_err(|e| MirrorError::network("http client", e.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn fetch_file(&self, url: &Url) -> Result<FetchResponse> {
        let path = url
            .to_file_path()
            .map_err(|_| MirrorError::network(url, "not a local file path"))?;
        let body = tokio::fs::read(&path)
            .await
            .map_err(|e| MirrorError::network(url, e.to_string()))?;

        let mut response = FetchResponse::new(url.clone(), body, None);
        response
            .metadata
            .insert("path".to_string(), path.display().to_string());
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, options: &RequestOptions) -> Result<FetchResponse> {
        if url.scheme() == "file" {
            return self.fetch_file(url).await;
        }

        let mut request = self.client.get(url.clone());
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MirrorError::network(url, "request timed out")
            } else if e.is_redirect() {
                MirrorError::network(url, format!("redirect error: {}", e))
            } else {
                MirrorError::network(url, e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::network(url, format!("HTTP {}", status.as_u16())));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|e| MirrorError::network(url, format!("failed to read body: {}", e)))?;

        let mut metadata = HashMap::new();
        metadata.insert("status".to_string(), status.as_u16().to_string());

        Ok(FetchResponse {
            final_url,
            body: body.to_vec(),
            content_type,
            metadata,
        })
    }
}
