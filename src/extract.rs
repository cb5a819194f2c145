//! Turn a raw [`ArticleRecord`] into validated [`ArticleMetadata`].
//!
//! This is the only place that knows which record fields are required and
//! what the defaults are for the optional ones.

use chrono::NaiveDate;

use crate::error::{FetchError, Result};
use crate::types::{ArticleMetadata, ArticleRecord, Author, RecordAuthor, RecordDate};

const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Validate a record and flatten it into metadata.
///
/// Fails with [`FetchError::MalformedRecord`] when the PMID, title, journal
/// or author list is absent, and with [`FetchError::InvalidDate`] when the
/// publication date does not name a real day.
pub fn extract_metadata(record: ArticleRecord) -> Result<ArticleMetadata> {
    let pmid = required(record.pmid.as_deref(), "PMID")?;
    let title = required(record.title.as_deref(), "title")?;
    let journal = required(record.journal.as_deref(), "journal")?;
    let raw_authors = record
        .authors
        .as_ref()
        .ok_or(FetchError::MalformedRecord {
            field: "author list",
        })?;

    let authors = raw_authors.iter().filter_map(convert_author).collect();
    let publication_date = parse_pub_date(&record.pub_date)?;

    Ok(ArticleMetadata {
        pmid,
        title,
        journal,
        authors,
        publication_date,
        doi: record.doi().map(ToOwned::to_owned),
        pmc_id: record.pmc_id().map(ToOwned::to_owned),
    })
}

/// Parse `<PubDate>` sub-fields, defaulting to 1900, January and the 1st.
pub fn parse_pub_date(date: &RecordDate) -> Result<NaiveDate> {
    let year_text = field_or(date.year.as_deref(), "1900");
    let month_text = field_or(date.month.as_deref(), "1");
    let day_text = field_or(date.day.as_deref(), "1");

    let invalid = || {
        FetchError::InvalidDate(format!("{}-{}-{}", year_text, month_text, day_text))
    };

    let year: i32 = year_text.parse().map_err(|_| invalid())?;
    let month = parse_month(month_text).ok_or_else(invalid)?;
    let day: u32 = day_text.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Map "Jan".."Dec" (any case) or a numeric month to 1..=12.
pub fn parse_month(text: &str) -> Option<u32> {
    if let Some(index) = MONTH_ABBREVIATIONS
        .iter()
        .position(|abbr| abbr.eq_ignore_ascii_case(text))
    {
        return Some(index as u32 + 1);
    }
    text.parse::<u32>().ok().filter(|m| (1..=12).contains(m))
}

fn required(value: Option<&str>, field: &'static str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
        .ok_or(FetchError::MalformedRecord { field })
}

fn field_or<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(default)
}

fn convert_author(raw: &RecordAuthor) -> Option<Author> {
    if let Some(collective) = raw.collective_name.as_deref().filter(|c| !c.trim().is_empty()) {
        return Some(Author::collective(collective));
    }
    let last = raw.last_name.as_deref().filter(|l| !l.trim().is_empty())?;
    let given = raw
        .fore_name
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .or(raw.initials.as_deref());
    Some(Author::from_parts(last, given))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArticleId;

    fn record() -> ArticleRecord {
        ArticleRecord {
            pmid: Some("111".to_string()),
            title: Some("NAD and Parkinson's disease".to_string()),
            journal: Some("Brain".to_string()),
            authors: Some(vec![RecordAuthor {
                last_name: Some("Smith".to_string()),
                fore_name: Some("Jane".to_string()),
                initials: Some("J".to_string()),
                collective_name: None,
            }]),
            pub_date: RecordDate {
                year: Some("2021".to_string()),
                month: Some("Mar".to_string()),
                day: Some("5".to_string()),
            },
            article_ids: vec![ArticleId {
                id_type: "doi".to_string(),
                value: "10.1093/brain/x".to_string(),
            }],
            elocation_doi: None,
        }
    }

    fn date(year: Option<&str>, month: Option<&str>, day: Option<&str>) -> RecordDate {
        RecordDate {
            year: year.map(ToOwned::to_owned),
            month: month.map(ToOwned::to_owned),
            day: day.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn test_extract_well_formed_record() {
        let metadata = extract_metadata(record()).unwrap();
        assert_eq!(metadata.pmid, "111");
        assert_eq!(metadata.journal, "Brain");
        assert_eq!(metadata.authors[0].display_name(), "Jane Smith");
        assert_eq!(
            metadata.publication_date,
            NaiveDate::from_ymd_opt(2021, 3, 5).unwrap()
        );
        assert_eq!(metadata.doi.as_deref(), Some("10.1093/brain/x"));
        assert!(metadata.pmc_id.is_none());
    }

    #[test]
    fn test_missing_title_is_malformed() {
        for title in [None, Some(String::new()), Some("   ".to_string())] {
            let mut rec = record();
            rec.title = title;
            assert!(matches!(
                extract_metadata(rec),
                Err(FetchError::MalformedRecord { field: "title" })
            ));
        }
    }

    #[test]
    fn test_missing_required_fields_are_malformed() {
        let mut rec = record();
        rec.pmid = None;
        assert!(matches!(
            extract_metadata(rec),
            Err(FetchError::MalformedRecord { field: "PMID" })
        ));

        let mut rec = record();
        rec.journal = None;
        assert!(matches!(
            extract_metadata(rec),
            Err(FetchError::MalformedRecord { field: "journal" })
        ));

        let mut rec = record();
        rec.authors = None;
        assert!(matches!(
            extract_metadata(rec),
            Err(FetchError::MalformedRecord {
                field: "author list"
            })
        ));
    }

    #[test]
    fn test_every_month_abbreviation_maps_to_its_number() {
        for (index, abbr) in MONTH_ABBREVIATIONS.iter().enumerate() {
            let parsed = parse_pub_date(&date(Some("2020"), Some(abbr), Some("1"))).unwrap();
            assert_eq!(parsed, NaiveDate::from_ymd_opt(2020, index as u32 + 1, 1).unwrap());
        }
    }

    #[test]
    fn test_unknown_month_abbreviation_is_invalid_date() {
        assert!(matches!(
            parse_pub_date(&date(Some("2020"), Some("Foo"), None)),
            Err(FetchError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_numeric_month_accepted() {
        let parsed = parse_pub_date(&date(Some("2019"), Some("07"), Some("14"))).unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2019, 7, 14).unwrap());
        assert!(parse_pub_date(&date(Some("2019"), Some("13"), None)).is_err());
    }

    #[test]
    fn test_absent_parts_use_defaults() {
        let parsed = parse_pub_date(&RecordDate::default()).unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());

        let parsed = parse_pub_date(&date(Some("2015"), None, None)).unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
    }

    #[test]
    fn test_impossible_day_is_invalid_date() {
        assert!(matches!(
            parse_pub_date(&date(Some("2021"), Some("Feb"), Some("30"))),
            Err(FetchError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_initials_used_without_fore_name() {
        let mut rec = record();
        rec.authors = Some(vec![
            RecordAuthor {
                last_name: Some("Lee".to_string()),
                initials: Some("B".to_string()),
                ..RecordAuthor::default()
            },
            RecordAuthor {
                collective_name: Some("PD Genetics Consortium".to_string()),
                ..RecordAuthor::default()
            },
            RecordAuthor::default(),
        ]);
        let metadata = extract_metadata(rec).unwrap();
        let names: Vec<&str> = metadata.authors.iter().map(|a| a.display_name()).collect();
        assert_eq!(names, vec!["B Lee", "PD Genetics Consortium"]);
    }
}
