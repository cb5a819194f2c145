//! # pubmed-pdf
//!
//! Search PubMed, download the matching articles' PDFs and write a
//! `summary.txt` with two citation styles per article.
//!
//! Provides:
//! - **Library**: async search, PDF location and download pipeline
//! - **CLI**: `pubmed-pdf` binary for terminal use (`cli` feature)
//!
//! PDFs are located from the PubMed Central id when the article has one,
//! otherwise from the DOI through OpenAlex. A failed download gets one more
//! attempt through the DOI landing page.
//!
//! ## Quick Start
//!
//! ```no_run
//! # async fn example() -> pubmed_pdf::error::Result<()> {
//! use pubmed_pdf::{parse_min_date, Config, Downloader, RunOutcome, SearchQuery};
//!
//! let config = Config::load()?;
//! let downloader = Downloader::new(&config)?;
//!
//! let query = SearchQuery::new(20, parse_min_date("2015/01/01")?)
//!     .with_keyword("NAD Parkinson")
//!     .with_author("Jane Smith");
//!
//! match downloader.run(&query, &Downloader::default_folder(&query)).await? {
//!     RunOutcome::NoResults => println!("nothing found"),
//!     RunOutcome::Completed(report) => {
//!         for article in &report.articles {
//!             println!("{:?}: {}", article.pmid, article.outcome.label());
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Citations
//!
//! ```
//! use chrono::NaiveDate;
//! use pubmed_pdf::{chicago_authors, Author};
//!
//! let authors = vec![Author::from_display("Jane Smith"), Author::from_display("Bob Lee")];
//! assert_eq!(chicago_authors(&authors), "Smith, Jane and Bob Lee");
//! # let _ = NaiveDate::from_ymd_opt(2021, 3, 5);
//! ```

pub mod citation;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod fetch;
pub mod locate;
pub mod openalex;
pub mod parse;
pub mod pipeline;
pub mod query;
pub mod rate_limit;
pub mod sanitize;
pub mod search;
pub mod summary;
pub mod types;

// Re-export key types at the crate root.
pub use citation::{chicago_authors, chicago_citation, mla_authors, mla_citation};
pub use client::EntrezClient;
pub use config::Config;
pub use error::FetchError;
pub use extract::extract_metadata;
pub use fallback::{DoiLandingResolver, FallbackResolver};
pub use fetch::{DownloadSource, PdfFetcher};
pub use locate::PdfLocator;
pub use openalex::{OpenAccessLocation, OpenAccessLookup, OpenAlexClient};
pub use pipeline::{ArticleOutcome, ArticleReport, Downloader, RunEvent, RunOutcome, RunReport};
pub use query::{parse_min_date, QueryBuilder, SearchQuery};
pub use search::SearchBackend;
pub use types::*;
