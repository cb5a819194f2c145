//! E-utilities response parsing.
//!
//! esearch is requested as JSON; efetch only speaks XML, which is read with a
//! streaming parser into [`ArticleRecord`]s.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Deserialize;

use crate::error::{FetchError, Result};
use crate::types::{ArticleId, ArticleRecord, RecordAuthor};

#[derive(Debug, Deserialize)]
struct ESearchEnvelope {
    esearchresult: Option<ESearchResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
    #[serde(rename = "ERROR")]
    error: Option<String>,
}

/// Parse an esearch JSON response into the ordered PMID list.
pub fn parse_esearch_response(json: &str) -> Result<Vec<String>> {
    let envelope: ESearchEnvelope = serde_json::from_str(json)
        .map_err(|e| FetchError::Parse(format!("Invalid esearch JSON: {}", e)))?;

    if let Some(error) = envelope.error {
        return Err(FetchError::Api {
            status: 200,
            message: error,
        });
    }

    let result = envelope
        .esearchresult
        .ok_or_else(|| FetchError::Parse("esearch response has no esearchresult".to_string()))?;

    if let Some(error) = result.error {
        return Err(FetchError::InvalidQuery(error));
    }

    Ok(result.idlist)
}

/// Which record field a run of text belongs to.
#[derive(Clone, Copy)]
enum TextTarget {
    Pmid,
    Title,
    Journal,
    Year,
    Month,
    Day,
    LastName,
    ForeName,
    Initials,
    CollectiveName,
    ELocation,
    ArticleId,
}

fn text_target(rel: &[&str]) -> Option<TextTarget> {
    match rel {
        ["MedlineCitation", "PMID"] => Some(TextTarget::Pmid),
        ["MedlineCitation", "Article", "ArticleTitle", ..] => Some(TextTarget::Title),
        ["MedlineCitation", "Article", "Journal", "Title"] => Some(TextTarget::Journal),
        ["MedlineCitation", "Article", "Journal", "JournalIssue", "PubDate", part] => match *part {
            "Year" => Some(TextTarget::Year),
            "Month" => Some(TextTarget::Month),
            "Day" => Some(TextTarget::Day),
            _ => None,
        },
        ["MedlineCitation", "Article", "AuthorList", "Author", "CollectiveName", ..] => {
            Some(TextTarget::CollectiveName)
        }
        ["MedlineCitation", "Article", "AuthorList", "Author", part] => match *part {
            "LastName" => Some(TextTarget::LastName),
            "ForeName" => Some(TextTarget::ForeName),
            "Initials" => Some(TextTarget::Initials),
            _ => None,
        },
        ["MedlineCitation", "Article", "ELocationID"] => Some(TextTarget::ELocation),
        ["PubmedData", "ArticleIdList", "ArticleId"] => Some(TextTarget::ArticleId),
        _ => None,
    }
}

/// Elements that open or close a nested value.
enum Element {
    AuthorList,
    Author,
    ELocation,
    ArticleId,
    Other,
}

fn classify(rel: &[&str]) -> Element {
    match rel {
        ["MedlineCitation", "Article", "AuthorList"] => Element::AuthorList,
        ["MedlineCitation", "Article", "AuthorList", "Author"] => Element::Author,
        ["MedlineCitation", "Article", "ELocationID"] => Element::ELocation,
        ["PubmedData", "ArticleIdList", "ArticleId"] => Element::ArticleId,
        _ => Element::Other,
    }
}

/// Streaming state for one efetch document.
#[derive(Default)]
struct EfetchState {
    /// Element names below `PubmedArticle`.
    rel_path: Vec<String>,
    in_article: bool,
    record: ArticleRecord,
    author: Option<RecordAuthor>,
    article_id: Option<ArticleId>,
    elocation_doi: Option<String>,
    records: Vec<ArticleRecord>,
}

impl EfetchState {
    fn rel(&self) -> Vec<&str> {
        self.rel_path.iter().map(String::as_str).collect()
    }

    fn start(&mut self, e: &BytesStart) {
        let name = local_name(e.local_name().as_ref());
        if !self.in_article {
            if name == "PubmedArticle" {
                self.in_article = true;
                self.record = ArticleRecord::default();
                self.rel_path.clear();
            }
            return;
        }

        self.rel_path.push(name);
        let element = classify(&self.rel());
        match element {
            Element::AuthorList => {
                self.record.authors.get_or_insert_with(Vec::new);
            }
            Element::Author => {
                self.author = Some(RecordAuthor::default());
            }
            Element::ELocation => {
                let is_doi = attribute(e, "EIdType")
                    .map(|t| t.eq_ignore_ascii_case("doi"))
                    .unwrap_or(false);
                self.elocation_doi = if is_doi { Some(String::new()) } else { None };
            }
            Element::ArticleId => {
                self.article_id = Some(ArticleId {
                    id_type: attribute(e, "IdType").unwrap_or_default(),
                    value: String::new(),
                });
            }
            Element::Other => {}
        }
    }

    fn end(&mut self) {
        if !self.in_article {
            return;
        }
        if self.rel_path.is_empty() {
            // Closing PubmedArticle itself.
            self.in_article = false;
            let mut record = std::mem::take(&mut self.record);
            normalize_record(&mut record);
            self.records.push(record);
            return;
        }

        let element = classify(&self.rel());
        match element {
            Element::Author => {
                if let (Some(author), Some(authors)) =
                    (self.author.take(), self.record.authors.as_mut())
                {
                    authors.push(author);
                }
            }
            Element::ELocation => {
                if let Some(doi) = self.elocation_doi.take() {
                    if self.record.elocation_doi.is_none() && !doi.trim().is_empty() {
                        self.record.elocation_doi = Some(doi.trim().to_string());
                    }
                }
            }
            Element::ArticleId => {
                if let Some(mut id) = self.article_id.take() {
                    id.value = id.value.trim().to_string();
                    if !id.value.is_empty() {
                        self.record.article_ids.push(id);
                    }
                }
            }
            Element::AuthorList | Element::Other => {}
        }
        self.rel_path.pop();
    }

    fn text(&mut self, text: &str) {
        if !self.in_article {
            return;
        }
        let Some(target) = text_target(&self.rel()) else {
            return;
        };

        let record = &mut self.record;
        let slot = match target {
            TextTarget::Pmid => &mut record.pmid,
            TextTarget::Title => &mut record.title,
            TextTarget::Journal => &mut record.journal,
            TextTarget::Year => &mut record.pub_date.year,
            TextTarget::Month => &mut record.pub_date.month,
            TextTarget::Day => &mut record.pub_date.day,
            TextTarget::ELocation => {
                if let Some(doi) = self.elocation_doi.as_mut() {
                    doi.push_str(text);
                }
                return;
            }
            TextTarget::ArticleId => {
                if let Some(id) = self.article_id.as_mut() {
                    id.value.push_str(text);
                }
                return;
            }
            TextTarget::LastName
            | TextTarget::ForeName
            | TextTarget::Initials
            | TextTarget::CollectiveName => {
                let Some(author) = self.author.as_mut() else {
                    return;
                };
                match target {
                    TextTarget::LastName => &mut author.last_name,
                    TextTarget::ForeName => &mut author.fore_name,
                    TextTarget::Initials => &mut author.initials,
                    _ => &mut author.collective_name,
                }
            }
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }
}

/// Parse an efetch XML response (`PubmedArticleSet`) into records, in document order.
pub fn parse_efetch_response(xml: &str) -> Result<Vec<ArticleRecord>> {
    let mut reader = Reader::from_str(xml);
    let mut state = EfetchState::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => state.start(&e),
            Ok(Event::End(_)) => state.end(),
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| FetchError::Parse(format!("XML text error: {}", err)))?;
                state.text(&text);
            }
            Ok(Event::CData(e)) => state.text(&String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FetchError::Parse(format!(
                    "XML parse error at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(state.records)
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attribute(e: &BytesStart, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Collapse internal whitespace left over from inline markup and line breaks.
fn normalize_whitespace(value: &mut Option<String>) {
    if let Some(text) = value.take() {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            *value = Some(collapsed);
        }
    }
}

fn normalize_record(record: &mut ArticleRecord) {
    normalize_whitespace(&mut record.pmid);
    normalize_whitespace(&mut record.title);
    normalize_whitespace(&mut record.journal);
    normalize_whitespace(&mut record.pub_date.year);
    normalize_whitespace(&mut record.pub_date.month);
    normalize_whitespace(&mut record.pub_date.day);
    if let Some(authors) = record.authors.as_mut() {
        for author in authors.iter_mut() {
            normalize_whitespace(&mut author.last_name);
            normalize_whitespace(&mut author.fore_name);
            normalize_whitespace(&mut author.initials);
            normalize_whitespace(&mut author.collective_name);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_EFETCH: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE PubmedArticleSet PUBLIC "-//NLM//DTD PubMedArticle, 1st January 2024//EN" "https://dtd.nlm.nih.gov/ncbi/pubmed/out/pubmed_240101.dtd">
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">111</PMID>
      <Article PubModel="Print">
        <Journal>
          <Title>Brain : a journal of neurology</Title>
          <JournalIssue CitedMedium="Internet">
            <Volume>144</Volume>
            <PubDate><Year>2021</Year><Month>Mar</Month><Day>5</Day></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>NAD<sup>+</sup> in <i>Parkinson's</i> disease &amp; ageing.</ArticleTitle>
        <ELocationID EIdType="doi" ValidYN="Y">10.1093/brain/awab001</ELocationID>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y">
            <LastName>Smith</LastName>
            <ForeName>Jane</ForeName>
            <Initials>J</Initials>
          </Author>
          <Author ValidYN="Y">
            <LastName>Lee</LastName>
            <Initials>B</Initials>
          </Author>
          <Author ValidYN="Y">
            <CollectiveName>Parkinson Study Group</CollectiveName>
          </Author>
        </AuthorList>
      </Article>
      <CommentsCorrectionsList>
        <CommentsCorrections RefType="Cites">
          <PMID Version="1">999</PMID>
        </CommentsCorrections>
      </CommentsCorrectionsList>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">111</ArticleId>
        <ArticleId IdType="pmc">PMC8000001</ArticleId>
      </ArticleIdList>
      <ReferenceList>
        <Reference>
          <ArticleIdList><ArticleId IdType="doi">10.9999/not-this-one</ArticleId></ArticleIdList>
        </Reference>
      </ReferenceList>
    </PubmedData>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">222</PMID>
      <Article PubModel="Print">
        <Journal>
          <Title>Movement Disorders</Title>
          <JournalIssue>
            <PubDate><Year>2019</Year></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Second article</ArticleTitle>
        <AuthorList>
          <Author><LastName>Doe</LastName><ForeName>John</ForeName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">222</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
</PubmedArticleSet>"#;

    #[test]
    fn test_parse_esearch_response() {
        let json = r#"{
            "header": {"type": "esearch", "version": "0.3"},
            "esearchresult": {"count": "2", "retmax": "2", "idlist": ["111", "222"]}
        }"#;
        assert_eq!(parse_esearch_response(json).unwrap(), vec!["111", "222"]);
    }

    #[test]
    fn test_parse_esearch_empty_idlist() {
        let json = r#"{"esearchresult": {"count": "0", "idlist": []}}"#;
        assert!(parse_esearch_response(json).unwrap().is_empty());
    }

    #[test]
    fn test_parse_esearch_error_field() {
        let json = r#"{"esearchresult": {"ERROR": "Empty term and query_key - nothing todo"}}"#;
        assert!(matches!(
            parse_esearch_response(json),
            Err(FetchError::InvalidQuery(_))
        ));

        let json = r#"{"error": "API key invalid"}"#;
        assert!(matches!(
            parse_esearch_response(json),
            Err(FetchError::Api { .. })
        ));
    }

    #[test]
    fn test_parse_efetch_records_in_order() {
        let records = parse_efetch_response(SAMPLE_EFETCH).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].pmid.as_deref(), Some("111"));
        assert_eq!(records[1].pmid.as_deref(), Some("222"));
    }

    #[test]
    fn test_parse_efetch_fields() {
        let records = parse_efetch_response(SAMPLE_EFETCH).unwrap();
        let first = &records[0];

        assert_eq!(
            first.title.as_deref(),
            Some("NAD+ in Parkinson's disease & ageing.")
        );
        assert_eq!(first.journal.as_deref(), Some("Brain : a journal of neurology"));
        assert_eq!(first.pub_date.year.as_deref(), Some("2021"));
        assert_eq!(first.pub_date.month.as_deref(), Some("Mar"));
        assert_eq!(first.pub_date.day.as_deref(), Some("5"));
        assert_eq!(first.pmc_id(), Some("PMC8000001"));
        assert_eq!(first.doi(), Some("10.1093/brain/awab001"));

        let authors = first.authors.as_ref().unwrap();
        assert_eq!(authors.len(), 3);
        assert_eq!(authors[0].fore_name.as_deref(), Some("Jane"));
        assert_eq!(authors[1].initials.as_deref(), Some("B"));
        assert_eq!(
            authors[2].collective_name.as_deref(),
            Some("Parkinson Study Group")
        );
    }

    #[test]
    fn test_reference_ids_are_not_article_ids() {
        let records = parse_efetch_response(SAMPLE_EFETCH).unwrap();
        assert!(records[0]
            .article_ids
            .iter()
            .all(|id| id.value != "10.9999/not-this-one"));
    }

    #[test]
    fn test_parse_efetch_missing_optional_parts() {
        let records = parse_efetch_response(SAMPLE_EFETCH).unwrap();
        let second = &records[1];
        assert_eq!(second.pub_date.month, None);
        assert_eq!(second.doi(), None);
        assert_eq!(second.pmc_id(), None);
    }

    #[test]
    fn test_parse_efetch_without_author_list() {
        let xml = r#"<PubmedArticleSet><PubmedArticle><MedlineCitation>
            <PMID>5</PMID><Article><Journal><Title>J</Title></Journal>
            <ArticleTitle>T</ArticleTitle></Article></MedlineCitation></PubmedArticle></PubmedArticleSet>"#;
        let records = parse_efetch_response(xml).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].authors.is_none());
    }

    #[test]
    fn test_parse_efetch_malformed_xml() {
        let xml = "<PubmedArticleSet><PubmedArticle></Wrong></PubmedArticleSet>";
        assert!(matches!(
            parse_efetch_response(xml),
            Err(FetchError::Parse(_))
        ));
    }
}
