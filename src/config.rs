//! Runtime configuration.
//!
//! The configuration is built once, before a run starts, and handed to the
//! clients and the downloader explicitly. Nothing below reads the environment
//! after construction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

/// Default NCBI E-utilities base URL.
pub const DEFAULT_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
/// Default OpenAlex API base URL.
pub const DEFAULT_OPENALEX_URL: &str = "https://api.openalex.org";
/// Default PubMed Central base URL.
pub const DEFAULT_PMC_URL: &str = "https://www.ncbi.nlm.nih.gov/pmc/articles";
/// Default DOI resolver base URL.
pub const DEFAULT_DOI_URL: &str = "https://doi.org";

/// Downloader configuration, loaded from `~/.config/pubmed-pdf/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Contact email sent to NCBI and OpenAlex with every request.
    pub email: String,
    /// Optional NCBI API key (raises the E-utilities limit to 10 req/s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Tool name reported to NCBI.
    pub tool: String,
    /// Number of article pipelines allowed in flight at once.
    pub concurrency: usize,
    /// Shared request budget for article hosts (PDF and fallback fetches).
    pub host_requests_per_second: f64,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Default lower bound on publication date (`YYYY/MM/DD`).
    pub min_date: String,
    /// Default number of search results.
    pub max_results: u32,
    pub eutils_url: String,
    pub openalex_url: String,
    pub pmc_url: String,
    pub doi_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: "default@example.com".to_string(),
            api_key: None,
            tool: "pubmed-pdf".to_string(),
            concurrency: 1,
            host_requests_per_second: 2.0,
            timeout_secs: 60,
            min_date: "2010/01/01".to_string(),
            max_results: 20,
            eutils_url: DEFAULT_EUTILS_URL.to_string(),
            openalex_url: DEFAULT_OPENALEX_URL.to_string(),
            pmc_url: DEFAULT_PMC_URL.to_string(),
            doi_url: DEFAULT_DOI_URL.to_string(),
        }
    }
}

impl Config {
    /// Standard config file path: `~/.config/pubmed-pdf/config.toml`.
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PUBMED_PDF_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("pubmed-pdf")
            .join("config.toml")
    }

    /// Load config from the standard path and apply environment overrides.
    pub fn load() -> Result<Self> {
        let config = Self::load_from(&Self::config_path())?.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a specific path, falling back to defaults if it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| FetchError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Apply `ENTREZ_EMAIL` and `NCBI_API_KEY` if they are set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(email) = non_empty_env("ENTREZ_EMAIL") {
            self.email = email;
        }
        if let Some(key) = non_empty_env("NCBI_API_KEY") {
            self.api_key = Some(key);
        }
        self
    }

    /// Reject values the downloader cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(FetchError::Config("email must not be empty".to_string()));
        }
        if self.concurrency == 0 {
            return Err(FetchError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if !(self.host_requests_per_second > 0.0) {
            return Err(FetchError::Config(
                "host_requests_per_second must be positive".to_string(),
            ));
        }
        if self.max_results == 0 {
            return Err(FetchError::Config(
                "max_results must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// NCBI allows 3 requests/second anonymously and 10 with an API key.
    pub fn eutils_requests_per_second(&self) -> f64 {
        if self.api_key.is_some() {
            10.0
        } else {
            3.0
        }
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)
            .map_err(|e| FetchError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.eutils_requests_per_second(), 3.0);
    }

    #[test]
    fn test_api_key_raises_eutils_rate() {
        let config = Config {
            api_key: Some("abc".to_string()),
            ..Config::default()
        };
        assert_eq!(config.eutils_requests_per_second(), 10.0);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.tool, "pubmed-pdf");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "email = \"me@lab.org\"\nconcurrency = 4\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.email, "me@lab.org");
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.max_results, 20);
        assert_eq!(config.pmc_url, DEFAULT_PMC_URL);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            api_key: Some("key".to_string()),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "concurrency = \"many\"").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(FetchError::Config(_))
        ));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(FetchError::Config(_))));
    }
}
