//! Page fetching.
//!
//! The [`PageFetcher`] trait is the seam between the exploration and
//! validation logic and the network. Its contract never fails: transport
//! errors come back inside [`FetchedPage::error`] so callers can record them
//! as observations. [`HttpFetcher`] is the reqwest-backed implementation;
//! [`FileFetcher`] serves a directory of saved pages through `file://` URLs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::parse::truncate_chars;
use crate::retry::{RetryPolicy, retry};
use crate::{Result, ScoutError};

/// Character ceiling for pages fetched by the exploration agent.
pub const EXPLORATION_PAGE_CHARS: usize = 50_000;

/// Character ceiling for sample pages fed to the selector validator.
pub const SAMPLE_PAGE_CHARS: usize = 200_000;

/// Markup preview length for homepages and listing pages shown to the Reasoner.
pub const LISTING_PREVIEW_CHARS: usize = 15_000;

/// Markup preview length for article pages shown to the Reasoner.
pub const ARTICLE_PREVIEW_CHARS: usize = 10_000;

/// HTTP client configuration for fetching web pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    /// Retry policy for timeouts, rate limiting and server errors.
    pub retry: RetryPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 15,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (compatible; sitescout/0.1)"
                .to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Result of fetching one page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchedPage {
    /// The URL that was requested.
    pub url: String,
    /// HTTP status, when a response arrived at all.
    pub status: Option<u16>,
    /// Page markup, truncated to the call site's ceiling.
    pub html: String,
    /// Length of the full body in characters, before truncation.
    pub total_chars: usize,
    /// Whether `html` was cut at the ceiling.
    pub truncated: bool,
    /// Transport or status failure, if any.
    pub error: Option<String>,
}

impl FetchedPage {
    /// A successfully fetched page, truncated to `max_chars`.
    pub fn ok(url: impl Into<String>, status: u16, body: &str, max_chars: usize) -> Self {
        let (html, truncated) = truncate_chars(body, max_chars);
        Self {
            url: url.into(),
            status: Some(status),
            html: html.to_string(),
            total_chars: body.chars().count(),
            truncated,
            error: None,
        }
    }

    /// A failed fetch.
    pub fn failed(url: impl Into<String>, status: Option<u16>, error: impl Into<String>) -> Self {
        Self { url: url.into(), status, error: Some(error.into()), ..Default::default() }
    }

    /// Whether markup is available.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Retrieves raw markup for a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, keeping at most `max_chars` characters of the body.
    async fn fetch(&self, url: &str, max_chars: usize) -> FetchedPage;
}

/// reqwest-backed [`PageFetcher`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Build a fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(ScoutError::HttpError)?;
        Ok(Self { client, config })
    }

    async fn fetch_once(&self, url: &Url) -> Result<(u16, String)> {
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() { ScoutError::Timeout { timeout: self.config.timeout } } else { ScoutError::HttpError(e) }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScoutError::HttpStatus { status: status.as_u16(), url: url.to_string() });
        }

        let body = response.text().await?;
        Ok((status.as_u16(), body))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, max_chars: usize) -> FetchedPage {
        let parsed = match Url::parse(url) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
            Ok(parsed) => return FetchedPage::failed(url, None, format!("Unsupported scheme: {}", parsed.scheme())),
            Err(e) => return FetchedPage::failed(url, None, ScoutError::InvalidUrl(e.to_string()).to_string()),
        };

        match retry(self.config.retry, url, || self.fetch_once(&parsed)).await {
            Ok((status, body)) => {
                debug!(%url, status, chars = body.len(), "fetched page");
                FetchedPage::ok(url, status, &body, max_chars)
            }
            Err(err) => {
                let status = match &err {
                    ScoutError::HttpStatus { status, .. } => Some(*status),
                    _ => None,
                };
                debug!(%url, error = %err, "fetch failed");
                FetchedPage::failed(url, status, err.to_string())
            }
        }
    }
}

/// Serves saved pages from a local directory.
///
/// Only `file://` URLs inside the root are read; a directory URL resolves to
/// its `index.html`.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    root: PathBuf,
}

impl FileFetcher {
    /// Open `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ScoutError::FileNotFound(root.to_path_buf()));
        }
        Ok(Self { root: fs::canonicalize(root)? })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `file://` URL of the root directory, ending in a slash.
    pub fn base_url(&self) -> Result<String> {
        Url::from_directory_path(&self.root)
            .map(String::from)
            .map_err(|_| ScoutError::InvalidUrl(format!("{}: not an absolute directory", self.root.display())))
    }

    /// URL of the root `index.html`, if there is one.
    pub fn index_url(&self) -> Option<String> {
        let index = self.root.join("index.html");
        if !index.is_file() {
            return None;
        }
        Url::from_file_path(index).ok().map(String::from)
    }

    /// Up to `limit` `*.html` pages below the root, in path order. The root
    /// `index.html` is left out.
    pub fn html_pages(&self, limit: usize) -> Result<Vec<String>> {
        let mut files = Vec::new();
        collect_html(&self.root, &mut files)?;
        files.sort();

        let index = self.root.join("index.html");
        Ok(files
            .into_iter()
            .filter(|path| *path != index)
            .filter_map(|path| Url::from_file_path(path).ok().map(String::from))
            .take(limit)
            .collect())
    }

    fn resolve(&self, url: &str) -> Result<PathBuf> {
        let parsed = Url::parse(url).map_err(|e| ScoutError::InvalidUrl(format!("{}: {}", url, e)))?;
        if parsed.scheme() != "file" {
            return Err(ScoutError::InvalidUrl(format!("Unsupported scheme: {}", parsed.scheme())));
        }
        let mut path = parsed
            .to_file_path()
            .map_err(|_| ScoutError::InvalidUrl(format!("{}: not a local path", url)))?;
        if path.is_dir() {
            path.push("index.html");
        }
        if !path.is_file() {
            return Err(ScoutError::FileNotFound(path));
        }
        let path = fs::canonicalize(path)?;
        if !path.starts_with(&self.root) {
            return Err(ScoutError::InvalidUrl(format!("{}: outside {}", url, self.root.display())));
        }
        Ok(path)
    }
}

fn collect_html(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_html(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html")) {
            files.push(path);
        }
    }
    Ok(())
}

#[async_trait]
impl PageFetcher for FileFetcher {
    async fn fetch(&self, url: &str, max_chars: usize) -> FetchedPage {
        let read = match self.resolve(url) {
            Ok(path) => tokio::fs::read_to_string(path).await.map_err(ScoutError::from),
            Err(err) => Err(err),
        };
        match read {
            Ok(body) => {
                debug!(%url, chars = body.len(), "read local page");
                FetchedPage::ok(url, 200, &body, max_chars)
            }
            Err(err) => {
                debug!(%url, error = %err, "local read failed");
                FetchedPage::failed(url, None, err.to_string())
            }
        }
    }
}
