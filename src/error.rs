//! Error types for the PubMed PDF downloader.

use std::time::Duration;

/// Errors that can occur while searching, resolving or downloading articles.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed (network, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote API returned an error status code.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Rate limited by a remote API (HTTP 429).
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Failed to parse an API response.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The search parameters cannot form a query.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The search returned no article ids.
    #[error("No articles found")]
    NoResults,

    /// A record is missing a required field.
    #[error("Malformed record: missing {field}")]
    MalformedRecord { field: &'static str },

    /// A record's publication date is not a valid calendar date.
    #[error("Invalid publication date: {0}")]
    InvalidDate(String),

    /// The article has neither a PMC id nor a DOI.
    #[error("No PMC id or DOI for PMID {pmid}")]
    NoIdentifier { pmid: String },

    /// Neither the primary fetch nor the fallback produced a file.
    #[error("Download failed for PMID {pmid}: {reason}")]
    DownloadFailed { pmid: String, reason: String },

    /// Filesystem error (destination folder, summary file, PDF writes).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for Results using [`FetchError`].
pub type Result<T> = std::result::Result<T, FetchError>;
