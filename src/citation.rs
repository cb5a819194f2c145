//! Citation strings for the summary file.
//!
//! Both styles are pure functions of the metadata; the access date for the
//! MLA-like style is passed in rather than read from the clock.

use chrono::NaiveDate;

use crate::types::{ArticleMetadata, Author};

/// "05 Mar. 2021".
pub fn day_month_year(date: NaiveDate) -> String {
    date.format("%d %b. %Y").to_string()
}

/// Up to three display names joined by " and ", plus " et al" past three.
pub fn mla_authors(authors: &[Author]) -> String {
    let joined = authors
        .iter()
        .take(3)
        .map(Author::display_name)
        .collect::<Vec<_>>()
        .join(" and ");
    if authors.len() > 3 {
        format!("{} et al", joined)
    } else {
        joined
    }
}

/// First author inverted; "A and B" for two, "A et al." for three or more.
pub fn chicago_authors(authors: &[Author]) -> String {
    match authors {
        [] => String::new(),
        [only] => only.inverted_name(),
        [first, second] => format!("{} and {}", first.inverted_name(), second.display_name()),
        [first, ..] => format!("{} et al.", first.inverted_name()),
    }
}

/// `Authors. "Title". Journal, DD Mon. YYYY, URL. Accessed DD Mon. YYYY.`
pub fn mla_citation(metadata: &ArticleMetadata, accessed: NaiveDate) -> String {
    format!(
        "{}\"{}\". {}, {}, {}. Accessed {}.",
        lead(&mla_authors(&metadata.authors)),
        metadata.title,
        metadata.journal,
        day_month_year(metadata.publication_date),
        metadata.article_url(),
        day_month_year(accessed)
    )
}

/// `Authors. YYYY. "Title". Journal. https://doi.org/DOI` (PubMed URL without a DOI).
pub fn chicago_citation(metadata: &ArticleMetadata) -> String {
    let link = match &metadata.doi {
        Some(doi) => format!("https://doi.org/{}", doi),
        None => metadata.article_url(),
    };
    format!(
        "{}{}. \"{}\". {}. {}",
        lead(&chicago_authors(&metadata.authors)),
        metadata.year(),
        metadata.title,
        metadata.journal,
        link
    )
}

/// Author segment followed by its period, without doubling one.
fn lead(authors: &str) -> String {
    if authors.is_empty() {
        String::new()
    } else if authors.ends_with('.') {
        format!("{} ", authors)
    } else {
        format!("{}. ", authors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authors(names: &[&str]) -> Vec<Author> {
        names.iter().map(|n| Author::from_display(n)).collect()
    }

    fn metadata(names: &[&str], doi: Option<&str>) -> ArticleMetadata {
        ArticleMetadata {
            pmid: "111".to_string(),
            title: "NAD in Parkinson disease".to_string(),
            journal: "Brain".to_string(),
            authors: authors(names),
            publication_date: NaiveDate::from_ymd_opt(2021, 3, 5).unwrap(),
            doi: doi.map(ToOwned::to_owned),
            pmc_id: None,
        }
    }

    #[test]
    fn test_chicago_two_authors() {
        assert_eq!(
            chicago_authors(&authors(&["Jane Smith", "Bob Lee"])),
            "Smith, Jane and Bob Lee"
        );
    }

    #[test]
    fn test_chicago_four_authors() {
        assert_eq!(
            chicago_authors(&authors(&["Jane Smith", "Bob Lee", "Ann Wu", "Raj Patel"])),
            "Smith, Jane et al."
        );
    }

    #[test]
    fn test_chicago_single_and_none() {
        assert_eq!(chicago_authors(&authors(&["Jane Smith"])), "Smith, Jane");
        assert_eq!(chicago_authors(&[]), "");
    }

    #[test]
    fn test_mla_authors_limits_to_three() {
        assert_eq!(
            mla_authors(&authors(&["Jane Smith", "Bob Lee"])),
            "Jane Smith and Bob Lee"
        );
        assert_eq!(
            mla_authors(&authors(&["A One", "B Two", "C Three"])),
            "A One and B Two and C Three"
        );
        assert_eq!(
            mla_authors(&authors(&["A One", "B Two", "C Three", "D Four"])),
            "A One and B Two and C Three et al"
        );
    }

    #[test]
    fn test_mla_citation_layout() {
        let accessed = NaiveDate::from_ymd_opt(2024, 11, 2).unwrap();
        assert_eq!(
            mla_citation(&metadata(&["Jane Smith", "Bob Lee"], None), accessed),
            "Jane Smith and Bob Lee. \"NAD in Parkinson disease\". Brain, 05 Mar. 2021, \
             https://pubmed.ncbi.nlm.nih.gov/111/. Accessed 02 Nov. 2024."
        );
    }

    #[test]
    fn test_chicago_citation_prefers_doi() {
        assert_eq!(
            chicago_citation(&metadata(&["Jane Smith", "Bob Lee"], Some("10.1/x"))),
            "Smith, Jane and Bob Lee. 2021. \"NAD in Parkinson disease\". Brain. https://doi.org/10.1/x"
        );
    }

    #[test]
    fn test_chicago_citation_without_doi_uses_pubmed_url() {
        let citation = chicago_citation(&metadata(&["A One", "B Two", "C Three"], None));
        assert_eq!(
            citation,
            "One, A et al. 2021. \"NAD in Parkinson disease\". Brain. https://pubmed.ncbi.nlm.nih.gov/111/"
        );
    }
}
