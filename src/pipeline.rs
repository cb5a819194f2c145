//! Search orchestration: one search, one batch fetch, then the per-article
//! pipeline (extract → locate → fetch → summary) for every record.
//!
//! Articles run through a bounded pool of `concurrency` pipelines. Results
//! are consumed in search order, so the summary file always lists articles
//! in the order the backend returned them, whatever order they finish in.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::client::EntrezClient;
use crate::config::Config;
use crate::error::{FetchError, Result};
use crate::extract::extract_metadata;
use crate::fallback::DoiLandingResolver;
use crate::fetch::{DownloadSource, FetchOutcome, PdfFetcher};
use crate::locate::PdfLocator;
use crate::openalex::OpenAlexClient;
use crate::query::SearchQuery;
use crate::rate_limit::RateLimiter;
use crate::sanitize::{folder_name, pdf_filename};
use crate::search::SearchBackend;
use crate::summary::SummaryWriter;
use crate::types::{ArticleMetadata, ArticleRecord, DownloadTarget};

/// What happened to one article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArticleOutcome {
    Downloaded {
        path: PathBuf,
        source: DownloadSource,
    },
    /// The PDF was already in the folder.
    AlreadyPresent { path: PathBuf },
    /// Neither a PMC id nor a DOI.
    NoIdentifier,
    Failed { reason: String },
    /// The record itself was unusable (missing fields, impossible date).
    Rejected { reason: String },
}

impl ArticleOutcome {
    /// True if the PDF is on disk and the article belongs in the summary.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ArticleOutcome::Downloaded { .. } | ArticleOutcome::AlreadyPresent { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArticleOutcome::Downloaded {
                source: DownloadSource::Primary,
                ..
            } => "downloaded",
            ArticleOutcome::Downloaded {
                source: DownloadSource::Fallback,
                ..
            } => "downloaded (DOI fallback)",
            ArticleOutcome::AlreadyPresent { .. } => "already present",
            ArticleOutcome::NoIdentifier => "no identifier",
            ArticleOutcome::Failed { .. } => "failed",
            ArticleOutcome::Rejected { .. } => "rejected",
        }
    }
}

/// Result for one search hit.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleReport {
    /// Position in the search results, from 0.
    pub index: usize,
    /// `None` only for records rejected without a PMID.
    pub pmid: Option<String>,
    pub title: Option<String>,
    pub outcome: ArticleOutcome,
    #[serde(skip)]
    pub metadata: Option<ArticleMetadata>,
}

/// Progress notifications sent while a run is in flight.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Searching { term: String },
    Found { total: usize },
    ArticleStarted { index: usize, pmid: Option<String> },
    ArticleFinished(ArticleReport),
    Finished { succeeded: usize, total: usize },
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub folder: PathBuf,
    pub summary_path: PathBuf,
    /// One report per record, in search order.
    pub articles: Vec<ArticleReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.articles
            .iter()
            .filter(|a| a.outcome.is_success())
            .count()
    }
}

/// How a run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The search matched nothing; no folder or summary was created.
    NoResults,
    Completed(RunReport),
}

/// One lock per target file, so two articles that map to the same file
/// name never download it at the same time.
#[derive(Default)]
struct PathLocks {
    locks: StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    async fn lock(&self, path: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(path.to_path_buf()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Drives searches and downloads.
///
/// # Example
///
/// ```no_run
/// use pubmed_pdf::{Config, Downloader, RunOutcome, SearchQuery};
///
/// # async fn example() -> pubmed_pdf::error::Result<()> {
/// let config = Config::load()?;
/// let downloader = Downloader::new(&config)?;
///
/// let query = SearchQuery::new(10, chrono::NaiveDate::from_ymd_opt(2015, 1, 1).unwrap())
///     .with_keyword("NAD Parkinson");
/// let folder = Downloader::default_folder(&query);
///
/// if let RunOutcome::Completed(report) = downloader.run(&query, &folder).await? {
///     println!("{} PDFs in {}", report.succeeded(), report.folder.display());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Downloader {
    backend: Arc<dyn SearchBackend>,
    locator: PdfLocator,
    fetcher: PdfFetcher,
    concurrency: usize,
    accessed: NaiveDate,
    events: Option<UnboundedSender<RunEvent>>,
}

impl Downloader {
    /// Wire up the PubMed, OpenAlex and article-host clients from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let backend = Arc::new(EntrezClient::new(config)?);
        let lookup = Arc::new(OpenAlexClient::new(config)?);
        let host_limiter = RateLimiter::new(config.host_requests_per_second);
        let fallback = Arc::new(DoiLandingResolver::new(config)?);

        let locator = PdfLocator::new(lookup).with_pmc_base(config.pmc_url.clone());
        let fetcher = PdfFetcher::new(config, host_limiter)?.with_fallback(fallback);

        Ok(Self::from_parts(backend, locator, fetcher).with_concurrency(config.concurrency))
    }

    /// Assemble a downloader from already-built collaborators.
    pub fn from_parts(
        backend: Arc<dyn SearchBackend>,
        locator: PdfLocator,
        fetcher: PdfFetcher,
    ) -> Self {
        Self {
            backend,
            locator,
            fetcher,
            concurrency: 1,
            accessed: chrono::Local::now().date_naive(),
            events: None,
        }
    }

    /// Number of article pipelines in flight at once (at least 1).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Date printed as "Accessed" in the MLA-style citation.
    pub fn with_access_date(mut self, date: NaiveDate) -> Self {
        self.accessed = date;
        self
    }

    /// Send [`RunEvent`]s to `events` during [`run`](Self::run).
    pub fn with_events(mut self, events: UnboundedSender<RunEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Folder named after the query terms, relative to the working directory.
    pub fn default_folder(query: &SearchQuery) -> PathBuf {
        PathBuf::from(folder_name(&query.label()))
    }

    /// Search, download every hit into `folder` and write `summary.txt`.
    ///
    /// Per-article problems end up in the report. Errors are returned only
    /// for the search itself and for the folder or summary file.
    pub async fn run(&self, query: &SearchQuery, folder: &Path) -> Result<RunOutcome> {
        let term = query.term()?;
        self.emit(RunEvent::Searching { term: term.clone() });

        let ids = self
            .backend
            .search(&term, query.max_results, query.min_date)
            .await?;
        if ids.is_empty() {
            tracing::info!(term = %term, "no articles found");
            self.emit(RunEvent::Finished {
                succeeded: 0,
                total: 0,
            });
            return Ok(RunOutcome::NoResults);
        }

        let records = self.backend.fetch_batch(&ids).await?;
        let total = records.len();
        self.emit(RunEvent::Found { total });

        tokio::fs::create_dir_all(folder).await?;
        let mut summary = SummaryWriter::create(folder, self.accessed).await?;

        let path_locks = PathLocks::default();
        let pipelines = stream::iter(records.into_iter().enumerate())
            .map(|(index, record)| self.process_article(index, record, folder, &path_locks))
            .buffered(self.concurrency);
        let mut pipelines = std::pin::pin!(pipelines);

        let mut articles = Vec::with_capacity(total);
        while let Some(report) = pipelines.next().await {
            if report.outcome.is_success() {
                if let Some(metadata) = &report.metadata {
                    summary.append(metadata).await?;
                }
            }
            self.emit(RunEvent::ArticleFinished(report.clone()));
            articles.push(report);
        }

        let report = RunReport {
            folder: folder.to_path_buf(),
            summary_path: summary.path().to_path_buf(),
            articles,
        };
        tracing::info!(
            folder = %folder.display(),
            succeeded = report.succeeded(),
            total,
            "run finished"
        );
        self.emit(RunEvent::Finished {
            succeeded: report.succeeded(),
            total,
        });
        Ok(RunOutcome::Completed(report))
    }

    async fn process_article(
        &self,
        index: usize,
        record: ArticleRecord,
        folder: &Path,
        path_locks: &PathLocks,
    ) -> ArticleReport {
        let pmid = record.pmid.clone();
        self.emit(RunEvent::ArticleStarted {
            index,
            pmid: pmid.clone(),
        });

        let metadata = match extract_metadata(record) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(pmid = ?pmid, error = %e, "skipping malformed record");
                return ArticleReport {
                    index,
                    pmid,
                    title: None,
                    outcome: ArticleOutcome::Rejected {
                        reason: e.to_string(),
                    },
                    metadata: None,
                };
            }
        };

        let path = folder.join(pdf_filename(&metadata));
        let outcome = {
            let _guard = path_locks.lock(&path).await;
            self.download(&metadata, path).await
        };
        ArticleReport {
            index,
            pmid: Some(metadata.pmid.clone()),
            title: Some(metadata.title.clone()),
            outcome,
            metadata: Some(metadata),
        }
    }

    async fn download(&self, metadata: &ArticleMetadata, path: PathBuf) -> ArticleOutcome {
        let pmid = metadata.pmid.as_str();
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(pmid, path = %path.display(), "already downloaded, skipping");
            return ArticleOutcome::AlreadyPresent { path };
        }

        let url = match self.locator.locate(pmid, &metadata.identifiers()).await {
            Ok(url) => url,
            Err(FetchError::NoIdentifier { .. }) => {
                tracing::info!(pmid, "no PMC id or DOI, skipping");
                return ArticleOutcome::NoIdentifier;
            }
            Err(e) => {
                tracing::warn!(pmid, error = %e, "could not locate PDF");
                return ArticleOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let target = DownloadTarget { url, path };
        match self
            .fetcher
            .fetch(pmid, &target, metadata.doi.as_deref())
            .await
        {
            Ok(FetchOutcome::AlreadyPresent) => ArticleOutcome::AlreadyPresent { path: target.path },
            Ok(FetchOutcome::Downloaded(source)) => ArticleOutcome::Downloaded {
                path: target.path,
                source,
            },
            Err(e) => {
                tracing::warn!(pmid, url = %target.url, error = %e, "download failed");
                ArticleOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn emit(&self, event: RunEvent) {
        if let Some(events) = &self.events {
            // A dropped receiver only means nobody is watching.
            let _ = events.send(event);
        }
    }
}
