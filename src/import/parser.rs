//! AniDB title dump parser
//!
//! Pulls events from the XML stream one at a time. Each `<anime>` subtree is
//! decoded into a [`RawRecord`]; records with a bad shape or unreadable
//! attributes are logged and skipped. Lexical errors abort the whole parse.

use super::comment::extract_generation_info;
use super::source::{ImportError, RawRecord, RawTitle};
use super::transform::to_document;
use crate::types::{AnimeDocument, ImportMetadata};
use chrono::{DateTime, SubsecRound, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, warn};

/// Result of parsing a whole dump
#[derive(Debug, Clone)]
pub struct ParsedDump {
    /// Documents in source order
    pub documents: Vec<AnimeDocument>,
    /// Import metadata; `id` is left empty for the caller to fill
    pub metadata: ImportMetadata,
    /// Number of `<anime>` records skipped
    pub skipped: usize,
}

/// Outcome of decoding one `<anime>` subtree
enum RecordResult {
    Record(RawRecord),
    /// Record had a bad shape; the subtree has been consumed
    Skipped(String),
}

/// Parser for `anime-titles.xml`
#[derive(Debug, Clone, Default)]
pub struct DumpParser {
    retrieved_at: Option<DateTime<Utc>>,
}

impl DumpParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed retrieval time instead of the current time
    pub fn with_retrieved_at(mut self, retrieved_at: DateTime<Utc>) -> Self {
        self.retrieved_at = Some(retrieved_at);
        self
    }

    /// Parse a decompressed dump
    pub fn parse(&self, bytes: &[u8]) -> Result<ParsedDump, ImportError> {
        let retrieved_at = self.retrieved_at.unwrap_or_else(Utc::now).trunc_subsecs(0);
        let mut metadata = ImportMetadata::retrieved(retrieved_at);

        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::with_capacity(8192);
        let mut record_buf = Vec::with_capacity(1024);
        let mut records = Vec::new();
        let mut skipped = 0usize;
        // Open elements outside of `<anime>` records
        let mut depth = 0usize;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| xml_error(&reader, e))?;

            match event {
                Event::Start(ref e) if e.local_name().as_ref() == b"anime" => {
                    let aid = attribute(e, b"aid");
                    match read_record(&mut reader, &mut record_buf, aid)? {
                        RecordResult::Record(record) => records.push(record),
                        RecordResult::Skipped(reason) => {
                            warn!("Skipping malformed anime record: {}", reason);
                            skipped += 1;
                        }
                    }
                }
                Event::Empty(ref e) if e.local_name().as_ref() == b"anime" => {
                    match attribute(e, b"aid").and_then(require_aid) {
                        Ok(aid) => records.push(RawRecord::new(aid)),
                        Err(reason) => {
                            warn!("Skipping malformed anime record: {}", reason);
                            skipped += 1;
                        }
                    }
                }
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Comment(ref e) => {
                    let text = String::from_utf8_lossy(e);
                    if let Some(info) = extract_generation_info(&text) {
                        debug!(
                            "Dump generated at {} ({} entries, {} titles)",
                            info.updated_at, info.entries, info.titles
                        );
                        metadata.updated_at = info.updated_at;
                        metadata.dump_entries = info.entries;
                        metadata.dump_titles = info.titles;
                    }
                }
                Event::Eof => {
                    if depth > 0 {
                        return Err(ImportError::Xml {
                            position: reader.buffer_position(),
                            message: "unexpected end of input: unclosed element".to_string(),
                        });
                    }
                    break;
                }
                _ => {}
            }

            buf.clear();
        }

        let documents = records.iter().map(to_document).collect();

        Ok(ParsedDump {
            documents,
            metadata,
            skipped,
        })
    }
}

fn xml_error(reader: &Reader<&[u8]>, e: quick_xml::Error) -> ImportError {
    ImportError::Xml {
        position: reader.buffer_position(),
        message: e.to_string(),
    }
}

/// Unescaped value of the attribute with the given local name
///
/// A broken attribute list (duplicates, missing quotes) or a bad escape is
/// reported as a reason to skip the enclosing record.
fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, String> {
    let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut found = None;
    for attr in element.attributes() {
        let attr = attr.map_err(|e| format!("bad attributes on <{}>: {}", tag, e))?;
        if found.is_none() && attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| format!("bad attribute value on <{}>: {}", tag, e))?;
            found = Some(value.into_owned());
        }
    }
    Ok(found)
}

fn parse_aid(raw: &str) -> Result<u64, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("aid '{}' is not an integer", raw))
}

fn require_aid(raw: Option<String>) -> Result<u64, String> {
    match raw {
        Some(raw) => parse_aid(&raw),
        None => Err("missing aid".to_string()),
    }
}

/// Title being collected inside a record
struct OpenTitle {
    title: RawTitle,
    /// A child element appeared inside the title
    nested: bool,
}

/// Decode the rest of an `<anime>` subtree whose start tag was just read
///
/// The subtree is always consumed, even when the record will be skipped. A
/// missing or empty `aid` skips the record rather than yielding aid 0.
fn read_record(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    aid: Result<Option<String>, String>,
) -> Result<RecordResult, ImportError> {
    let mut titles = Vec::new();
    let mut problem: Option<String> = None;
    let mut current: Option<OpenTitle> = None;
    // Depth of unknown elements being skipped, or nested inside a title
    let mut inner_depth = 0usize;

    loop {
        buf.clear();
        let event = reader.read_event_into(buf).map_err(|e| xml_error(reader, e))?;

        match event {
            Event::Start(ref e) => {
                if inner_depth > 0 {
                    inner_depth += 1;
                } else if let Some(open) = current.as_mut() {
                    open.nested = true;
                    inner_depth = 1;
                } else if e.local_name().as_ref() == b"title" {
                    match title_from_attributes(e) {
                        Ok(title) => {
                            current = Some(OpenTitle {
                                title,
                                nested: false,
                            })
                        }
                        Err(reason) => {
                            problem.get_or_insert(reason);
                            inner_depth = 1;
                        }
                    }
                } else {
                    inner_depth = 1;
                }
            }
            Event::Empty(ref e) => {
                if inner_depth > 0 {
                    continue;
                }
                if let Some(open) = current.as_mut() {
                    open.nested = true;
                } else if e.local_name().as_ref() == b"title" {
                    match title_from_attributes(e) {
                        Ok(title) => titles.push(title),
                        Err(reason) => {
                            problem.get_or_insert(reason);
                        }
                    }
                }
            }
            Event::Text(ref e) => {
                if inner_depth == 0 {
                    if let Some(open) = current.as_mut() {
                        let text = e.unescape().map_err(|e| xml_error(reader, e))?;
                        open.title.text.push_str(&text);
                    }
                }
            }
            Event::CData(ref e) => {
                if inner_depth == 0 {
                    if let Some(open) = current.as_mut() {
                        open.title.text.push_str(&String::from_utf8_lossy(e));
                    }
                }
            }
            Event::End(_) => {
                if inner_depth > 0 {
                    inner_depth -= 1;
                } else if let Some(open) = current.take() {
                    if open.nested && problem.is_none() {
                        problem = Some(format!(
                            "element nested inside <title type=\"{}\">",
                            open.title.kind
                        ));
                    }
                    titles.push(open.title);
                } else {
                    // End of the <anime> element
                    break;
                }
            }
            Event::Eof => {
                return Err(ImportError::Xml {
                    position: reader.buffer_position(),
                    message: "unexpected end of input inside <anime>".to_string(),
                });
            }
            _ => {}
        }
    }

    if let Some(reason) = problem {
        return Ok(RecordResult::Skipped(reason));
    }
    let aid = match aid.and_then(require_aid) {
        Ok(aid) => aid,
        Err(reason) => return Ok(RecordResult::Skipped(reason)),
    };

    Ok(RecordResult::Record(RawRecord { aid, titles }))
}

fn title_from_attributes(element: &BytesStart<'_>) -> Result<RawTitle, String> {
    Ok(RawTitle {
        kind: attribute(element, b"type")?.unwrap_or_default(),
        language: attribute(element, b"lang")?.unwrap_or_default(),
        text: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Aid;
    use chrono::TimeZone;

    const SAMPLE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- Created: Sat Jan 11 02:00:02 2025 (3 anime, 7 titles) -->
<animetitles>
  <anime aid="1">
    <title xml:lang="x-jat" type="main">Seikai no Monshou</title>
    <title xml:lang="en" type="official">Crest of the Stars</title>
    <title xml:lang="en" type="official">Crest of Stars</title>
    <title xml:lang="ja" type="kana">せいかいのもんしょう</title>
  </anime>
  <anime aid="2">
    <title xml:lang="x-jat" type="main">Cowboy Bebop</title>
    <title xml:lang="en" type="short">CB</title>
  </anime>
  <anime aid="3">
    <title xml:lang="x-jat" type="main">Tom &amp; Jerry</title>
  </anime>
</animetitles>
"#;

    fn parser() -> DumpParser {
        DumpParser::new().with_retrieved_at(Utc.with_ymd_and_hms(2025, 1, 12, 8, 30, 0).unwrap())
    }

    #[test]
    fn test_parse_sample() {
        let parsed = parser().parse(SAMPLE_XML.as_bytes()).unwrap();

        assert_eq!(parsed.documents.len(), 3);
        assert_eq!(parsed.skipped, 0);

        let first = &parsed.documents[0];
        assert_eq!(first.aid, Aid(1));
        assert_eq!(first.main_title, "Seikai no Monshou");
        assert_eq!(
            first.official_titles["en"],
            vec!["Crest of the Stars", "Crest of Stars"]
        );
        assert_eq!(parsed.documents[2].main_title, "Tom & Jerry");
    }

    #[test]
    fn test_metadata_from_comment() {
        let parsed = parser().parse(SAMPLE_XML.as_bytes()).unwrap();
        let meta = parsed.metadata;

        assert_eq!(meta.retrieved_at, Utc.with_ymd_and_hms(2025, 1, 12, 8, 30, 0).unwrap());
        assert_eq!(meta.updated_at, Utc.with_ymd_and_hms(2025, 1, 11, 2, 0, 2).unwrap());
        assert_eq!(meta.dump_entries, 3);
        assert_eq!(meta.dump_titles, 7);
        assert!(meta.id.is_empty());
    }

    #[test]
    fn test_retrieved_at_truncated_to_seconds() {
        let at = Utc.with_ymd_and_hms(2025, 1, 12, 8, 30, 0).unwrap()
            + chrono::Duration::milliseconds(750);
        let parsed = DumpParser::new()
            .with_retrieved_at(at)
            .parse(b"<animetitles/>")
            .unwrap();
        assert_eq!(
            parsed.metadata.retrieved_at,
            Utc.with_ymd_and_hms(2025, 1, 12, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_no_comment_leaves_defaults() {
        let parsed = parser().parse(b"<animetitles></animetitles>").unwrap();
        assert!(parsed.documents.is_empty());
        assert_eq!(parsed.metadata.updated_at, DateTime::<Utc>::default());
        assert_eq!(parsed.metadata.dump_entries, 0);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let xml = r#"<animetitles>
  <anime aid="10"><title type="main" xml:lang="x-jat">Good One</title></anime>
  <anime aid="abc"><title type="main" xml:lang="x-jat">Bad Aid</title></anime>
  <anime><title type="main" xml:lang="x-jat">No Aid</title></anime>
  <anime aid="11"><title type="main" xml:lang="x-jat">Nested <b>bold</b></title></anime>
  <anime aid="12"><title type="main" xml:lang="x-jat">Good Two</title><extra><x/>ignored</extra></anime>
</animetitles>"#;
        let parsed = parser().parse(xml.as_bytes()).unwrap();

        assert_eq!(parsed.skipped, 3);
        let aids: Vec<_> = parsed.documents.iter().map(|d| d.aid.get()).collect();
        assert_eq!(aids, vec![10, 12]);
        assert_eq!(parsed.documents[1].main_title, "Good Two");
    }

    #[test]
    fn test_duplicate_attributes_skip_only_their_record() {
        let xml = r#"<animetitles>
  <anime aid="1"><title type="main" xml:lang="x-jat">First</title></anime>
  <anime aid="2" aid="3"><title type="main" xml:lang="x-jat">Twice</title></anime>
  <anime aid="4"><title type="main" type="syn" xml:lang="en">Clash</title></anime>
  <anime aid="5"><title type="main" xml:lang="x-jat">Last</title></anime>
  <anime aid="6" aid="7"/>
  <anime aid="8"><title type="syn" type="main"/></anime>
</animetitles>"#;
        let parsed = parser().parse(xml.as_bytes()).unwrap();

        assert_eq!(parsed.skipped, 4);
        let aids: Vec<_> = parsed.documents.iter().map(|d| d.aid.get()).collect();
        assert_eq!(aids, vec![1, 5]);
        assert_eq!(parsed.documents[1].main_title, "Last");
    }

    #[test]
    fn test_self_closing_elements() {
        let xml = r#"<animetitles><anime aid="4"/><anime aid="5"><title type="syn" xml:lang="en"/></anime></animetitles>"#;
        let parsed = parser().parse(xml.as_bytes()).unwrap();

        assert_eq!(parsed.documents.len(), 2);
        assert_eq!(parsed.documents[0], AnimeDocument::new(4u64));
        assert_eq!(parsed.documents[1].synonymous_titles["en"], vec![""]);
    }

    #[test]
    fn test_mismatched_tag_is_fatal() {
        let xml = r#"<animetitles><anime aid="1"><title type="main">X</anime></animetitles>"#;
        let err = parser().parse(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, ImportError::Xml { .. }));
    }

    #[test]
    fn test_truncated_input_is_fatal() {
        let xml = r#"<animetitles><anime aid="1"><title type="main">X</title>"#;
        assert!(matches!(
            parser().parse(xml.as_bytes()),
            Err(ImportError::Xml { .. })
        ));

        let xml = r#"<animetitles><anime aid="1"></anime>"#;
        assert!(matches!(
            parser().parse(xml.as_bytes()),
            Err(ImportError::Xml { .. })
        ));
    }
}
