//! Open-access lookup by DOI through OpenAlex.
//!
//! API docs: https://docs.openalex.org/api-entities/works/get-a-single-work

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::client::{handle_response, http_client};
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::rate_limit::RateLimiter;

/// Where an open-access copy of a work may live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenAccessLocation {
    /// Direct open-access URL (often a PDF).
    pub open_access_url: Option<String>,
    /// Landing page of the primary location, used when no OA URL is known.
    pub landing_page_url: Option<String>,
}

impl OpenAccessLocation {
    /// The open-access URL if present, else the landing page.
    pub fn best_url(&self) -> Option<&str> {
        self.open_access_url
            .as_deref()
            .or(self.landing_page_url.as_deref())
    }
}

/// Resolves a DOI to candidate download locations.
#[async_trait]
pub trait OpenAccessLookup: Send + Sync {
    async fn resolve(&self, doi: &str) -> Result<OpenAccessLocation>;
}

#[derive(Debug, Deserialize)]
struct WorkResponse {
    open_access: Option<OpenAccessField>,
    primary_location: Option<LocationField>,
}

#[derive(Debug, Deserialize)]
struct OpenAccessField {
    oa_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocationField {
    landing_page_url: Option<String>,
}

/// Parse a single-work response into an [`OpenAccessLocation`].
pub fn parse_work_response(json: &str) -> Result<OpenAccessLocation> {
    let work: WorkResponse = serde_json::from_str(json)
        .map_err(|e| FetchError::Parse(format!("Invalid OpenAlex work: {}", e)))?;

    Ok(OpenAccessLocation {
        open_access_url: work
            .open_access
            .and_then(|oa| oa.oa_url)
            .filter(|u| !u.is_empty()),
        landing_page_url: work
            .primary_location
            .and_then(|loc| loc.landing_page_url)
            .filter(|u| !u.is_empty()),
    })
}

/// Async client for the OpenAlex works endpoint.
#[derive(Clone)]
pub struct OpenAlexClient {
    http: Client,
    base_url: String,
    email: String,
    rate_limiter: RateLimiter,
}

impl OpenAlexClient {
    /// Create a client that joins the OpenAlex polite pool with the configured email.
    pub fn new(config: &Config) -> Result<Self> {
        let user_agent = format!(
            "{}/{} (mailto:{})",
            config.tool,
            env!("CARGO_PKG_VERSION"),
            config.email
        );
        Ok(Self {
            http: http_client(config.timeout(), &user_agent)?,
            base_url: config.openalex_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            rate_limiter: RateLimiter::new(10.0),
        })
    }

    /// Override the base URL (useful for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetch the open-access locations for a DOI.
    pub async fn lookup(&self, doi: &str) -> Result<OpenAccessLocation> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/works/https://doi.org/{}", self.base_url, doi.trim());
        let response = self
            .http
            .get(&url)
            .query(&[("mailto", self.email.as_str())])
            .send()
            .await?;
        let body = handle_response(response).await?;
        let location = parse_work_response(&body)?;
        tracing::debug!(
            doi,
            oa_url = ?location.open_access_url,
            landing = ?location.landing_page_url,
            "OpenAlex lookup"
        );
        Ok(location)
    }
}

#[async_trait]
impl OpenAccessLookup for OpenAlexClient {
    async fn resolve(&self, doi: &str) -> Result<OpenAccessLocation> {
        self.lookup(doi).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_parse_prefers_oa_url() {
        let json = r#"{
            "id": "https://openalex.org/W1",
            "open_access": {"is_oa": true, "oa_url": "https://host.org/paper.pdf"},
            "primary_location": {"landing_page_url": "https://doi.org/10.1/x"}
        }"#;
        let location = parse_work_response(json).unwrap();
        assert_eq!(location.best_url(), Some("https://host.org/paper.pdf"));
    }

    #[test]
    fn test_parse_falls_back_to_landing_page() {
        let json = r#"{
            "open_access": {"is_oa": false, "oa_url": null},
            "primary_location": {"landing_page_url": "https://doi.org/10.1/x"}
        }"#;
        let location = parse_work_response(json).unwrap();
        assert!(location.open_access_url.is_none());
        assert_eq!(location.best_url(), Some("https://doi.org/10.1/x"));
    }

    #[test]
    fn test_parse_with_neither_field() {
        let json = r#"{"open_access": {"oa_url": null}, "primary_location": null}"#;
        let location = parse_work_response(json).unwrap();
        assert_eq!(location.best_url(), None);
    }

    #[tokio::test]
    async fn test_lookup_requests_work_by_doi_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works/https://doi.org/10.1093/brain/x")
            .match_query(Matcher::UrlEncoded("mailto".into(), "lab@example.org".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"open_access": {"oa_url": "https://host.org/x.pdf"}}"#)
            .create_async()
            .await;

        let config = Config {
            email: "lab@example.org".to_string(),
            ..Config::default()
        };
        let client = OpenAlexClient::new(&config)
            .unwrap()
            .with_base_url(server.url());
        let location = client.resolve("10.1093/brain/x").await.unwrap();

        mock.assert_async().await;
        assert_eq!(location.best_url(), Some("https://host.org/x.pdf"));
    }

    #[tokio::test]
    async fn test_lookup_unknown_doi_is_api_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", Matcher::Regex(r"^/works/.*$".to_string()))
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let client = OpenAlexClient::new(&Config::default())
            .unwrap()
            .with_base_url(server.url());
        assert!(matches!(
            client.resolve("10.0/missing").await,
            Err(FetchError::Api { status: 404, .. })
        ));
    }
}
