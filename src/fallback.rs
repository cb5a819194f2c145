//! Last-resort PDF resolution through the DOI landing page.
//!
//! Publishers expose the PDF location of an article in a
//! `<meta name="citation_pdf_url">` tag (the Highwire/Google Scholar
//! convention). The resolver follows `https://doi.org/<doi>`, saves the
//! response if it is already a PDF, and otherwise follows that tag.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::fetch::{browser_headers, is_pdf, write_atomic, DEFAULT_REFERER};

/// Best-effort DOI-to-PDF resolution.
///
/// Implementations write the PDF to `output` or leave it untouched; they
/// never report errors.
#[async_trait]
pub trait FallbackResolver: Send + Sync {
    async fn attempt(&self, doi: &str, output: &Path);
}

/// Resolves a DOI via its landing page's `citation_pdf_url` meta tag.
#[derive(Clone)]
pub struct DoiLandingResolver {
    http: Client,
    doi_base: String,
}

impl DoiLandingResolver {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(FetchError::Http)?;
        Ok(Self {
            http,
            doi_base: config.doi_url.trim_end_matches('/').to_string(),
        })
    }

    /// Override the DOI resolver base URL (useful for testing).
    pub fn with_doi_base(mut self, base: impl Into<String>) -> Self {
        self.doi_base = base.into().trim_end_matches('/').to_string();
        self
    }

    async fn resolve(&self, doi: &str, output: &Path) -> Result<bool> {
        let landing_url = format!("{}/{}", self.doi_base, doi.trim());
        let response = self
            .http
            .get(&landing_url)
            .headers(browser_headers(DEFAULT_REFERER))
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::debug!(doi, status = response.status().as_u16(), "DOI landing page refused");
            return Ok(false);
        }

        let final_url = response.url().clone();
        let body = response.bytes().await?;
        if is_pdf(&body) {
            write_atomic(output, &body).await?;
            return Ok(true);
        }

        let html = String::from_utf8_lossy(&body);
        let Some(pdf_url) = find_citation_pdf_url(&html, &final_url) else {
            tracing::debug!(doi, landing = %final_url, "no citation_pdf_url on landing page");
            return Ok(false);
        };

        let response = self
            .http
            .get(pdf_url.clone())
            .headers(browser_headers(final_url.as_str()))
            .send()
            .await?;
        if !response.status().is_success() {
            tracing::debug!(doi, url = %pdf_url, status = response.status().as_u16(), "citation PDF refused");
            return Ok(false);
        }

        let bytes = response.bytes().await?;
        if !is_pdf(&bytes) {
            return Ok(false);
        }
        write_atomic(output, &bytes).await?;
        Ok(true)
    }
}

#[async_trait]
impl FallbackResolver for DoiLandingResolver {
    async fn attempt(&self, doi: &str, output: &Path) {
        match self.resolve(doi, output).await {
            Ok(true) => tracing::debug!(doi, "fallback resolver wrote PDF"),
            Ok(false) => {}
            Err(e) => tracing::warn!(doi, error = %e, "fallback resolver failed"),
        }
    }
}

/// Absolute PDF URL from a page's `citation_pdf_url` meta tag.
pub fn find_citation_pdf_url(html: &str, base: &Url) -> Option<Url> {
    let selector = Selector::parse(r#"meta[name="citation_pdf_url"]"#).ok()?;
    let document = Html::parse_document(html);
    let content = document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())?;
    base.join(content).ok()
}
