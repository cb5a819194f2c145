//! Decide where to download an article's PDF from.
//!
//! Priority: PMC id (no network) > DOI via open-access lookup > nothing.

use std::sync::Arc;

use crate::config::DEFAULT_PMC_URL;
use crate::error::{FetchError, Result};
use crate::openalex::OpenAccessLookup;
use crate::types::Identifiers;

/// Canonical PMC PDF URL for a PMC id under `base`.
pub fn pmc_pdf_url(base: &str, pmc_id: &str) -> String {
    format!("{}/{}/pdf", base.trim_end_matches('/'), pmc_id.trim())
}

/// Resolves an article's identifiers to a candidate download URL.
#[derive(Clone)]
pub struct PdfLocator {
    pmc_base: String,
    lookup: Arc<dyn OpenAccessLookup>,
}

impl PdfLocator {
    pub fn new(lookup: Arc<dyn OpenAccessLookup>) -> Self {
        Self {
            pmc_base: DEFAULT_PMC_URL.to_string(),
            lookup,
        }
    }

    /// Override the PMC base URL (useful for testing).
    pub fn with_pmc_base(mut self, base: impl Into<String>) -> Self {
        self.pmc_base = base.into();
        self
    }

    /// Pick a URL for the article.
    ///
    /// Returns [`FetchError::NoIdentifier`] when there is neither a PMC id nor
    /// a DOI, and [`FetchError::DownloadFailed`] when the DOI lookup knows no
    /// location.
    pub async fn locate(&self, pmid: &str, ids: &Identifiers) -> Result<String> {
        if let Some(pmc_id) = ids.pmc_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(pmc_pdf_url(&self.pmc_base, pmc_id));
        }

        let Some(doi) = ids.doi.as_deref().filter(|d| !d.is_empty()) else {
            return Err(FetchError::NoIdentifier {
                pmid: pmid.to_string(),
            });
        };

        let location = self.lookup.resolve(doi).await?;
        location
            .best_url()
            .map(ToOwned::to_owned)
            .ok_or_else(|| FetchError::DownloadFailed {
                pmid: pmid.to_string(),
                reason: format!("no open-access location for DOI {}", doi),
            })
    }
}
