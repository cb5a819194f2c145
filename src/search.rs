//! Search and batch-fetch endpoints.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::client::EntrezClient;
use crate::error::Result;
use crate::parse::{parse_efetch_response, parse_esearch_response};
use crate::types::ArticleRecord;

/// Above this many ids efetch is sent as a form POST instead of a GET.
pub const POST_ID_THRESHOLD: usize = 200;

/// The bibliographic database the downloader queries.
///
/// A run makes exactly two calls: one [`search`](Self::search), then one
/// [`fetch_batch`](Self::fetch_batch) for the returned ids.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Ordered article ids (relevance order), at most `max_results`,
    /// published on or after `min_date`.
    async fn search(&self, term: &str, max_results: u32, min_date: NaiveDate)
        -> Result<Vec<String>>;

    /// Full records for `ids`, in the same order.
    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<ArticleRecord>>;
}

impl EntrezClient {
    /// Run esearch and return PMIDs in relevance order.
    pub async fn search_ids(
        &self,
        term: &str,
        max_results: u32,
        min_date: NaiveDate,
    ) -> Result<Vec<String>> {
        let retmax = max_results.to_string();
        let mindate = min_date.format("%Y/%m/%d").to_string();

        // mindate is ignored unless maxdate is present as well.
        let params = vec![
            ("db", "pubmed"),
            ("term", term),
            ("retmax", retmax.as_str()),
            ("sort", "relevance"),
            ("datetype", "pdat"),
            ("mindate", mindate.as_str()),
            ("maxdate", "3000"),
            ("retmode", "json"),
        ];

        let body = self.get("esearch.fcgi", &params).await?;
        let ids = parse_esearch_response(&body)?;
        tracing::info!(term, count = ids.len(), "PubMed search finished");
        Ok(ids)
    }

    /// Run efetch for `ids` and parse the returned `PubmedArticleSet`.
    pub async fn fetch_records(&self, ids: &[String]) -> Result<Vec<ArticleRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let id_list = ids.join(",");
        let params = vec![("db", "pubmed"), ("id", id_list.as_str()), ("retmode", "xml")];

        let body = if ids.len() > POST_ID_THRESHOLD {
            self.post("efetch.fcgi", &params).await?
        } else {
            self.get("efetch.fcgi", &params).await?
        };
        let records = parse_efetch_response(&body)?;
        tracing::debug!(requested = ids.len(), received = records.len(), "efetch finished");
        Ok(records)
    }
}

#[async_trait]
impl SearchBackend for EntrezClient {
    async fn search(
        &self,
        term: &str,
        max_results: u32,
        min_date: NaiveDate,
    ) -> Result<Vec<String>> {
        self.search_ids(term, max_results, min_date).await
    }

    async fn fetch_batch(&self, ids: &[String]) -> Result<Vec<ArticleRecord>> {
        self.fetch_records(ids).await
    }
}
