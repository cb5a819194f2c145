//! Filesystem-safe names for download folders and PDF files.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ArticleMetadata;

/// Characters kept as-is: word characters, whitespace, hyphen and dot.
static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-.]").expect("static regex is valid"));

/// Number of title characters that make it into a filename.
pub const TITLE_CHARS: usize = 50;

/// Replace every character outside `[\w\s.-]` with `_`, then every
/// whitespace character with `_`.
///
/// Applying this twice gives the same result as applying it once.
pub fn sanitize_name(input: &str) -> String {
    UNSAFE_CHARS
        .replace_all(input, "_")
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Folder name derived from the search terms.
pub fn folder_name(query_text: &str) -> String {
    sanitize_name(query_text.trim())
}

/// `<FirstAuthorFirstName>_<Year>_<Title>.pdf`, with the title cut to
/// [`TITLE_CHARS`] characters before sanitizing.
pub fn pdf_filename(metadata: &ArticleMetadata) -> String {
    let author = metadata
        .authors
        .first()
        .map(|a| a.first_name_token())
        .unwrap_or("Unknown");
    let title: String = metadata.title.chars().take(TITLE_CHARS).collect();

    format!(
        "{}_{}_{}.pdf",
        sanitize_name(author),
        metadata.year(),
        sanitize_name(title.trim())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Author;
    use chrono::NaiveDate;

    fn metadata(title: &str, authors: &[&str]) -> ArticleMetadata {
        ArticleMetadata {
            pmid: "1".to_string(),
            title: title.to_string(),
            journal: "J".to_string(),
            authors: authors.iter().map(|a| Author::from_display(a)).collect(),
            publication_date: NaiveDate::from_ymd_opt(2021, 3, 5).unwrap(),
            doi: None,
            pmc_id: None,
        }
    }

    #[test]
    fn test_sanitize_replaces_unsafe_and_spaces() {
        assert_eq!(sanitize_name("NAD Parkinson"), "NAD_Parkinson");
        assert_eq!(sanitize_name("a/b:c*d?"), "a_b_c_d_");
        assert_eq!(sanitize_name("v1.2-final"), "v1.2-final");
        assert_eq!(sanitize_name("tab\there"), "tab_here");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for input in [
            "NAD Parkinson",
            "Smith J[Author] AND (brain OR \"gut\")",
            "éléphant/été 2020",
            "  leading and trailing  ",
            "",
        ] {
            let once = sanitize_name(input);
            assert_eq!(sanitize_name(&once), once);
        }
    }

    #[test]
    fn test_folder_name() {
        assert_eq!(folder_name(" NAD Parkinson "), "NAD_Parkinson");
    }

    #[test]
    fn test_pdf_filename_layout() {
        let meta = metadata("NAD+ precursors: a trial", &["Jane Smith", "Bob Lee"]);
        assert_eq!(pdf_filename(&meta), "Jane_2021_NAD__precursors__a_trial.pdf");
    }

    #[test]
    fn test_pdf_filename_truncates_title() {
        let long_title = "x".repeat(120);
        let meta = metadata(&long_title, &["Jane Smith"]);
        let name = pdf_filename(&meta);
        assert_eq!(name, format!("Jane_2021_{}.pdf", "x".repeat(TITLE_CHARS)));
    }

    #[test]
    fn test_pdf_filename_is_stable_under_sanitizing() {
        let meta = metadata("Mitochondria & α-synuclein / a review", &["Ana María López"]);
        let name = pdf_filename(&meta);
        assert_eq!(sanitize_name(&name), name);
    }

    #[test]
    fn test_pdf_filename_without_authors() {
        let meta = metadata("Title", &[]);
        assert_eq!(pdf_filename(&meta), "Unknown_2021_Title.pdf");
    }
}
