//! Download a PDF to its target path, with one fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use reqwest::Client;
use serde::Serialize;

use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::fallback::FallbackResolver;
use crate::rate_limit::RateLimiter;
use crate::types::DownloadTarget;

/// Desktop browser identity; several article hosts refuse obvious bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const BROWSER_ACCEPT: &str =
    "application/pdf,text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Referer sent with primary PDF requests.
pub const DEFAULT_REFERER: &str = "https://www.ncbi.nlm.nih.gov/";

/// Browser-like request headers.
pub(crate) fn browser_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert(REFERER, value);
    }
    headers
}

/// True if `bytes` carries the `%PDF` signature within its first kilobyte.
pub fn is_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(4).any(|w| w == b"%PDF")
}

/// Write through a `.part` sibling so a half-written file is never mistaken
/// for a finished download.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".part");
    let partial = PathBuf::from(partial);

    let written = match tokio::fs::write(&partial, bytes).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = tokio::fs::remove_file(&partial).await;
    }
    written
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// How a PDF ended up on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DownloadSource {
    /// The located URL served the PDF.
    Primary,
    /// The DOI fallback resolver wrote it.
    Fallback,
}

/// Successful fetch results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The target file was already on disk; nothing was requested.
    AlreadyPresent,
    Downloaded(DownloadSource),
}

/// Performs the PDF GET and, on failure, the DOI fallback.
#[derive(Clone)]
pub struct PdfFetcher {
    http: Client,
    rate_limiter: RateLimiter,
    referer: String,
    fallback: Option<Arc<dyn FallbackResolver>>,
}

impl PdfFetcher {
    /// `rate_limiter` is the budget shared by every request to article hosts.
    pub fn new(config: &Config, rate_limiter: RateLimiter) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::Http)?;
        Ok(Self {
            http,
            rate_limiter,
            referer: DEFAULT_REFERER.to_string(),
            fallback: None,
        })
    }

    /// Resolver tried once when the primary fetch fails and a DOI is known.
    pub fn with_fallback(mut self, fallback: Arc<dyn FallbackResolver>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Make sure `target.path` holds the article's PDF.
    ///
    /// Existing files are left alone and count as success. Otherwise the URL
    /// is fetched; if that fails and `doi` is known, the fallback resolver
    /// gets exactly one attempt. [`FetchError::DownloadFailed`] means neither
    /// produced a file.
    pub async fn fetch(
        &self,
        pmid: &str,
        target: &DownloadTarget,
        doi: Option<&str>,
    ) -> Result<FetchOutcome> {
        if file_exists(&target.path).await {
            tracing::info!(pmid, path = %target.path.display(), "already downloaded, skipping");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let primary_error = match self.fetch_primary(target).await {
            Ok(()) => {
                tracing::info!(pmid, path = %target.path.display(), "downloaded");
                return Ok(FetchOutcome::Downloaded(DownloadSource::Primary));
            }
            Err(e) => e,
        };
        tracing::debug!(pmid, url = %target.url, error = %primary_error, "primary download failed");

        if let (Some(doi), Some(fallback)) = (doi, self.fallback.as_ref()) {
            self.rate_limiter.acquire().await;
            fallback.attempt(doi, &target.path).await;
            if file_exists(&target.path).await {
                tracing::info!(pmid, doi, path = %target.path.display(), "downloaded via DOI fallback");
                return Ok(FetchOutcome::Downloaded(DownloadSource::Fallback));
            }
        }

        Err(FetchError::DownloadFailed {
            pmid: pmid.to_string(),
            reason: primary_error.to_string(),
        })
    }

    async fn fetch_primary(&self, target: &DownloadTarget) -> Result<()> {
        self.rate_limiter.acquire().await;

        let response = self
            .http
            .get(&target.url)
            .headers(browser_headers(&self.referer))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Api {
                status: status.as_u16(),
                message: format!("GET {}", target.url),
            });
        }

        let bytes = response.bytes().await?;
        if !is_pdf(&bytes) {
            return Err(FetchError::Parse(format!(
                "{} did not return a PDF ({} bytes)",
                target.url,
                bytes.len()
            )));
        }

        write_atomic(&target.path, &bytes).await?;
        Ok(())
    }
}
