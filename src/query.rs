//! Search parameters and the Entrez term builder.
//!
//! # Example
//!
//! ```
//! use pubmed_pdf::QueryBuilder;
//!
//! let term = QueryBuilder::new()
//!     .keyword("NAD Parkinson")
//!     .and()
//!     .author("Smith J")
//!     .build();
//! assert_eq!(term, "NAD Parkinson AND \"Smith J\"[Author]");
//! ```

use chrono::NaiveDate;

use crate::error::{FetchError, Result};

/// Builder for constructing Entrez query terms.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    parts: Vec<String>,
}

impl QueryBuilder {
    /// Create a new empty query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add free-text keywords, left to PubMed's automatic term mapping.
    pub fn keyword(mut self, text: &str) -> Self {
        self.parts.push(text.trim().to_string());
        self
    }

    /// Add an author search term.
    pub fn author(mut self, name: &str) -> Self {
        self.parts.push(field_term(name, "Author"));
        self
    }

    /// Add an AND operator.
    pub fn and(mut self) -> Self {
        self.parts.push("AND".to_string());
        self
    }

    /// Build the final query string.
    pub fn build(self) -> String {
        self.parts.join(" ")
    }
}

fn field_term(value: &str, tag: &str) -> String {
    format!("\"{}\"[{}]", value.trim().replace('"', ""), tag)
}

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub author: Option<String>,
    pub max_results: u32,
    pub min_date: NaiveDate,
}

impl SearchQuery {
    /// A query with no terms yet.
    pub fn new(max_results: u32, min_date: NaiveDate) -> Self {
        Self {
            keyword: None,
            author: None,
            max_results,
            min_date,
        }
    }

    /// Set the keyword term; blank input clears it.
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = non_blank(keyword.into());
        self
    }

    /// Set the author term; blank input clears it.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = non_blank(author.into());
        self
    }

    /// At least one term must be present and `max_results` must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.keyword.is_none() && self.author.is_none() {
            return Err(FetchError::InvalidQuery(
                "enter a keyword or an author".to_string(),
            ));
        }
        if self.max_results == 0 {
            return Err(FetchError::InvalidQuery(
                "max results must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Entrez term for the keyword and author fields.
    pub fn term(&self) -> Result<String> {
        self.validate()?;
        let mut builder = QueryBuilder::new();
        if let Some(keyword) = &self.keyword {
            builder = builder.keyword(keyword);
        }
        if let Some(author) = &self.author {
            if self.keyword.is_some() {
                builder = builder.and();
            }
            builder = builder.author(author);
        }
        Ok(builder.build())
    }

    /// The terms joined by a space, used to name the default folder.
    pub fn label(&self) -> String {
        [self.keyword.as_deref(), self.author.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse `YYYY/MM/DD`, `YYYY-MM-DD` or a bare year.
pub fn parse_min_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .ok()
        .or_else(|| {
            text.parse::<i32>()
                .ok()
                .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
        })
        .ok_or_else(|| FetchError::InvalidQuery(format!("unrecognized date: {}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap()
    }

    #[test]
    fn test_keyword_only_term() {
        let query = SearchQuery::new(20, min_date()).with_keyword("NAD Parkinson");
        assert_eq!(query.term().unwrap(), "NAD Parkinson");
    }

    #[test]
    fn test_author_only_term() {
        let query = SearchQuery::new(20, min_date()).with_author("Smith J");
        assert_eq!(query.term().unwrap(), "\"Smith J\"[Author]");
    }

    #[test]
    fn test_combined_term() {
        let query = SearchQuery::new(20, min_date())
            .with_keyword("NAD Parkinson")
            .with_author("Smith J");
        assert_eq!(query.term().unwrap(), "NAD Parkinson AND \"Smith J\"[Author]");
        assert_eq!(query.label(), "NAD Parkinson Smith J");
    }

    #[test]
    fn test_blank_terms_rejected() {
        let query = SearchQuery::new(20, min_date())
            .with_keyword("   ")
            .with_author("");
        assert!(matches!(query.term(), Err(FetchError::InvalidQuery(_))));
    }

    #[test]
    fn test_zero_max_results_rejected() {
        let query = SearchQuery::new(0, min_date()).with_keyword("x");
        assert!(matches!(query.validate(), Err(FetchError::InvalidQuery(_))));
    }

    #[test]
    fn test_builder_strips_quotes_from_author() {
        let term = QueryBuilder::new().author(" O\"Brien K ").build();
        assert_eq!(term, "\"OBrien K\"[Author]");
    }

    #[test]
    fn test_parse_min_date_formats() {
        assert_eq!(parse_min_date("2015/01/01").unwrap(), min_date());
        assert_eq!(parse_min_date("2015-01-01").unwrap(), min_date());
        assert_eq!(parse_min_date("2015").unwrap(), min_date());
        assert!(parse_min_date("last week").is_err());
    }
}
