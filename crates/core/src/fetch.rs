//! Content fetching from URLs, files, and stdin.
//!
//! Network access goes through the [`FetchGateway`] trait so the orchestrator
//! can be driven by any transport. [`ReqwestGateway`] is the HTTP
//! implementation; [`fetch_file`] and [`fetch_stdin`] read local payloads.

use std::fs;
use std::path::PathBuf;
#[cfg(feature = "fetch")]
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::detect::RawContentFragment;
use crate::{Result, SyndicError};

/// HTTP method of a detail or list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// Body sent with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl FetchOptions {
    pub fn get() -> Self {
        Self::default()
    }

    /// A POST carrying `body` as JSON.
    pub fn post_json(body: Value) -> Self {
        Self { method: Method::Post, headers: Vec::new(), body: Some(RequestBody::Json(body)) }
    }

    /// Adds a header, builder style.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Transport used for list and detail requests.
#[async_trait]
pub trait FetchGateway: Send + Sync {
    /// Fetches `url` and returns the body as text or parsed JSON.
    ///
    /// # Errors
    ///
    /// Network failures, timeouts and non-success statuses are errors.
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<RawContentFragment>;
}

/// HTTP client configuration for fetching web pages.
///
/// This struct controls timeout, user agent and extra header settings for
/// HTTP requests.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    /// Headers sent with every request, before per-request headers.
    pub headers: Vec<(String, String)>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36"
                .to_string(),
            headers: vec![("Accept-Language".to_string(), "zh-CN,zh;q=0.9,en;q=0.8".to_string())],
        }
    }
}

/// [`FetchGateway`] backed by a shared reqwest client.
///
/// Follows redirects, respects the configured timeout, and sends a
/// browser-like User-Agent for better compatibility.
#[cfg(feature = "fetch")]
#[derive(Debug, Clone)]
pub struct ReqwestGateway {
    client: reqwest::Client,
    config: FetchConfig,
}

#[cfg(feature = "fetch")]
impl ReqwestGateway {
    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`SyndicError::Http`] if the TLS backend cannot be initialised.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[cfg(feature = "fetch")]
#[async_trait]
impl FetchGateway for ReqwestGateway {
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<RawContentFragment> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SyndicError::InvalidUrl(format!("unsupported scheme in {url}")));
        }

        let mut request = match options.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };
        request = request.header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8",
        );
        for (name, value) in self.config.headers.iter().chain(options.headers.iter()) {
            request = request.header(name.as_str(), value.as_str());
        }
        request = match &options.body {
            Some(RequestBody::Json(body)) => request.json(body),
            Some(RequestBody::Text(body)) => request.body(body.clone()),
            None => request,
        };

        let timeout = self.config.timeout;
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() { SyndicError::Timeout { timeout } } else { SyndicError::Http(e) }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyndicError::HttpStatus { status: status.as_u16(), url: url.to_string() });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() { SyndicError::Timeout { timeout } } else { SyndicError::Http(e) }
        })?;

        tracing::debug!(url = %url, status = status.as_u16(), bytes = body.len(), "fetched");
        Ok(RawContentFragment::from_body(body, content_type.as_deref()))
    }
}

/// Parses an absolute http(s) URL.
///
/// # Errors
///
/// Returns [`SyndicError::InvalidUrl`] for relative or non-http URLs.
pub fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| SyndicError::InvalidUrl(format!("{url}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SyndicError::InvalidUrl("URL must include a scheme (http:// or https://)".to_string()));
    }
    Ok(parsed)
}

/// Reads a payload from a local file.
///
/// Callers should validate and sanitize the path when accepting user input.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(SyndicError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(SyndicError::from)
    }
}

/// Reads a payload from standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(SyndicError::from)?;

    Ok(buffer)
}
