//! The NCBI E-utilities client.

use std::time::Duration;

use reqwest::Client;

use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::rate_limit::RateLimiter;

/// Async client for the NCBI E-utilities (esearch / efetch).
///
/// # Example
///
/// ```no_run
/// # async fn example() -> pubmed_pdf::error::Result<()> {
/// use chrono::NaiveDate;
/// use pubmed_pdf::{Config, EntrezClient};
///
/// let client = EntrezClient::new(&Config::default())?;
/// let min_date = NaiveDate::from_ymd_opt(2015, 1, 1).unwrap();
/// let ids = client.search_ids("NAD Parkinson", 20, min_date).await?;
/// let records = client.fetch_records(&ids).await?;
/// println!("{} records", records.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EntrezClient {
    pub(crate) http: Client,
    pub(crate) base_url: String,
    pub(crate) email: String,
    pub(crate) tool: String,
    pub(crate) api_key: Option<String>,
    pub(crate) rate_limiter: RateLimiter,
}

impl EntrezClient {
    /// Create a client identified by the configured tool name and email.
    pub fn new(config: &Config) -> Result<Self> {
        let user_agent = format!("{}/{}", config.tool, env!("CARGO_PKG_VERSION"));
        Ok(Self {
            http: http_client(config.timeout(), &user_agent)?,
            base_url: config.eutils_url.trim_end_matches('/').to_string(),
            email: config.email.clone(),
            tool: config.tool.clone(),
            api_key: config.api_key.clone(),
            rate_limiter: RateLimiter::new(config.eutils_requests_per_second()),
        })
    }

    /// Override the base URL (useful for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the rate limit (requests per second).
    pub fn with_rate_limit(mut self, per_second: f64) -> Self {
        self.rate_limiter = RateLimiter::new(per_second);
        self
    }

    /// GET an E-utilities endpoint (`esearch.fcgi`, `efetch.fcgi`, ...).
    pub(crate) async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        let query = self.with_identification(params);

        tracing::debug!(endpoint, "E-utilities GET");
        let response = self.http.get(&url).query(&query).send().await?;
        handle_response(response).await
    }

    /// POST form-encoded parameters; NCBI wants this for long id lists.
    pub(crate) async fn post(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        let form = self.with_identification(params);

        tracing::debug!(endpoint, "E-utilities POST");
        let response = self.http.post(&url).form(&form).send().await?;
        handle_response(response).await
    }

    /// `params` plus `tool`, `email` and, when configured, `api_key`.
    fn with_identification<'a>(
        &'a self,
        params: &[(&'a str, &'a str)],
    ) -> Vec<(&'a str, &'a str)> {
        let mut all = params.to_vec();
        all.push(("tool", &self.tool));
        all.push(("email", &self.email));
        if let Some(key) = &self.api_key {
            all.push(("api_key", key));
        }
        all
    }
}

/// Build the shared reqwest client used by every API wrapper.
pub(crate) fn http_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
        .map_err(FetchError::Http)
}

/// Handle the HTTP response, mapping status codes to errors.
pub(crate) async fn handle_response(response: reqwest::Response) -> Result<String> {
    let status = response.status().as_u16();

    match status {
        200..=299 => Ok(response.text().await?),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(FetchError::RateLimited { retry_after })
        }
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(FetchError::Api {
                status,
                message: body,
            })
        }
    }
}
