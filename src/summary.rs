//! The per-run `summary.txt` report.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::citation::{chicago_citation, mla_citation};
use crate::error::Result;
use crate::types::ArticleMetadata;

/// File name of the report inside the download folder.
pub const SUMMARY_FILE: &str = "summary.txt";

/// Shown in place of a missing DOI.
pub const MISSING_DOI: &str = "N/A";

/// The text block for one downloaded article, including the trailing blank line.
pub fn format_entry(metadata: &ArticleMetadata, accessed: NaiveDate) -> String {
    format!(
        "Title: {}\n\
         Authors: {}\n\
         Journal: {}\n\
         Date: {}\n\
         PMID: {}\n\
         DOI: {}\n\
         URL: {}\n\
         MLA Citation: {}\n\
         Chicago Citation: {}\n\n",
        metadata.title,
        metadata.author_list(),
        metadata.journal,
        metadata.publication_date.format("%Y-%m-%d"),
        metadata.pmid,
        metadata.doi.as_deref().unwrap_or(MISSING_DOI),
        metadata.article_url(),
        mla_citation(metadata, accessed),
        chicago_citation(metadata),
    )
}

/// Append-only writer for one run's summary file.
///
/// The file is truncated when the writer is created and flushed after every
/// entry, so whatever has been appended survives a later failure.
pub struct SummaryWriter {
    file: File,
    path: PathBuf,
    accessed: NaiveDate,
    entries: usize,
}

impl SummaryWriter {
    /// Create (or truncate) `<folder>/summary.txt`.
    pub async fn create(folder: &Path, accessed: NaiveDate) -> Result<Self> {
        let path = folder.join(SUMMARY_FILE);
        let file = File::create(&path).await?;
        Ok(Self {
            file,
            path,
            accessed,
            entries: 0,
        })
    }

    pub async fn append(&mut self, metadata: &ArticleMetadata) -> Result<()> {
        let entry = format_entry(metadata, self.accessed);
        self.file.write_all(entry.as_bytes()).await?;
        self.file.flush().await?;
        self.entries += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries written so far.
    pub fn entries(&self) -> usize {
        self.entries
    }
}
