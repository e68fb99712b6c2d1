//! Mapping from dump records to index documents

use super::source::RawRecord;
use crate::types::{AnimeDocument, TitleMap};

/// Title `type` attribute values and the document field they feed
const MAIN: &str = "main";
const OFFICIAL: &str = "official";
const SHORT: &str = "short";
const SYNONYM: &str = "syn";
const KANA: &str = "kana";
const CARD: &str = "card";

/// Turn a record into a search document
///
/// The last `main` title wins. Other known types are grouped by language,
/// keeping source order within each language. Unknown types are dropped.
pub fn to_document(record: &RawRecord) -> AnimeDocument {
    let mut doc = AnimeDocument::new(record.aid);

    for title in &record.titles {
        let map: &mut TitleMap = match title.kind.as_str() {
            MAIN => {
                doc.main_title = title.text.clone();
                continue;
            }
            OFFICIAL => &mut doc.official_titles,
            SHORT => &mut doc.short_titles,
            SYNONYM => &mut doc.synonymous_titles,
            KANA => &mut doc.kana_titles,
            CARD => &mut doc.card_titles,
            _ => continue,
        };
        map.entry(title.language.clone())
            .or_default()
            .push(title.text.clone());
    }

    doc
}
