//! Public types for the downloader.
//!
//! [`ArticleRecord`] mirrors what efetch returns and keeps every field
//! optional; [`ArticleMetadata`] is the validated form the rest of the
//! pipeline works with.

use std::path::PathBuf;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Canonical PubMed landing page for a PMID.
pub fn pubmed_url(pmid: &str) -> String {
    format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)
}

/// A raw PubMed article as returned by efetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleRecord {
    pub pmid: Option<String>,
    pub title: Option<String>,
    pub journal: Option<String>,
    /// `None` when the record carries no `AuthorList` at all.
    pub authors: Option<Vec<RecordAuthor>>,
    pub pub_date: RecordDate,
    /// `ArticleIdList` entries, in document order.
    pub article_ids: Vec<ArticleId>,
    /// DOI from `ELocationID EIdType="doi"`, if any.
    pub elocation_doi: Option<String>,
}

impl ArticleRecord {
    /// First article id with the given `IdType`.
    pub fn article_id(&self, id_type: &str) -> Option<&str> {
        self.article_ids
            .iter()
            .find(|id| id.id_type.eq_ignore_ascii_case(id_type))
            .map(|id| id.value.as_str())
            .filter(|v| !v.is_empty())
    }

    /// PubMed Central id (`PMC1234567`).
    pub fn pmc_id(&self) -> Option<&str> {
        self.article_id("pmc")
    }

    /// DOI from the id list, falling back to the electronic location.
    pub fn doi(&self) -> Option<&str> {
        self.article_id("doi")
            .or(self.elocation_doi.as_deref())
            .filter(|v| !v.is_empty())
    }
}

/// One `<Author>` element.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordAuthor {
    pub last_name: Option<String>,
    pub fore_name: Option<String>,
    pub initials: Option<String>,
    pub collective_name: Option<String>,
}

/// The `<PubDate>` sub-fields, verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordDate {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
}

/// One `<ArticleId IdType="...">` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleId {
    pub id_type: String,
    pub value: String,
}

/// An author of an article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    /// Display name ("First Last").
    pub name: String,
    /// Family (last) name, or the whole name for collectives.
    pub family_name: String,
    /// Given name or initials.
    pub given_name: Option<String>,
}

impl Author {
    /// Build an author from PubMed's separate name parts.
    pub fn from_parts(family_name: &str, given_name: Option<&str>) -> Self {
        let family_name = family_name.trim().to_string();
        let given_name = given_name
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(ToOwned::to_owned);
        let name = match &given_name {
            Some(given) => format!("{} {}", given, family_name),
            None => family_name.clone(),
        };
        Author {
            name,
            family_name,
            given_name,
        }
    }

    /// Parse a display name ("First M. Last"); the last word is the family name.
    pub fn from_display(name: &str) -> Self {
        let words: Vec<&str> = name.split_whitespace().collect();
        match words.split_last() {
            Some((last, given)) if !given.is_empty() => Author {
                name: words.join(" "),
                family_name: last.to_string(),
                given_name: Some(given.join(" ")),
            },
            _ => Author {
                name: name.trim().to_string(),
                family_name: name.trim().to_string(),
                given_name: None,
            },
        }
    }

    /// A group author such as "The ABC Consortium".
    pub fn collective(name: &str) -> Self {
        Author {
            name: name.trim().to_string(),
            family_name: name.trim().to_string(),
            given_name: None,
        }
    }

    /// Format as "First M. Last" for display.
    pub fn display_name(&self) -> &str {
        &self.name
    }

    /// Format as "Last, First M.".
    pub fn inverted_name(&self) -> String {
        match &self.given_name {
            Some(given) => format!("{}, {}", self.family_name, given),
            None => self.family_name.clone(),
        }
    }

    /// First token of the given name, or the family name when there is none.
    pub fn first_name_token(&self) -> &str {
        self.given_name
            .as_deref()
            .and_then(|g| g.split_whitespace().next())
            .unwrap_or(&self.family_name)
    }
}

/// Validated, flat metadata for one article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArticleMetadata {
    pub pmid: String,
    pub title: String,
    pub journal: String,
    pub authors: Vec<Author>,
    pub publication_date: NaiveDate,
    pub doi: Option<String>,
    pub pmc_id: Option<String>,
}

impl ArticleMetadata {
    /// Publication year.
    pub fn year(&self) -> i32 {
        self.publication_date.year()
    }

    /// PubMed URL for this article.
    pub fn article_url(&self) -> String {
        pubmed_url(&self.pmid)
    }

    /// Identifiers the PDF locator works from.
    pub fn identifiers(&self) -> Identifiers {
        Identifiers {
            pmc_id: self.pmc_id.clone(),
            doi: self.doi.clone(),
        }
    }

    /// Authors as display names joined with ", ".
    pub fn author_list(&self) -> String {
        self.authors
            .iter()
            .map(Author::display_name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Identifiers that can lead to a PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identifiers {
    pub pmc_id: Option<String>,
    pub doi: Option<String>,
}

/// A resolved URL and the local path it should be written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub url: String,
    pub path: PathBuf,
}
