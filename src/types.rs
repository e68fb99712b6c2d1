//! Core types for michiru

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Titles of one category grouped by language code, in source order per language
pub type TitleMap = BTreeMap<String, Vec<String>>;

// ============================================================================
// Anime identifier
// ============================================================================

/// AniDB anime identifier
///
/// Serialized as a JSON number. Deserialization also accepts a numeric string,
/// which is how the search engine renders numbers inside `_formatted` hits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Aid(pub u64);

impl Aid {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Aid {
    fn from(value: u64) -> Self {
        Aid(value)
    }
}

impl Serialize for Aid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Aid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(n) => Ok(Aid(n)),
            Repr::Text(s) => s
                .trim()
                .parse()
                .map(Aid)
                .map_err(|_| serde::de::Error::custom(format!("invalid aid: {:?}", s))),
        }
    }
}

// ============================================================================
// Search documents
// ============================================================================

/// Index-ready representation of one `<anime>` record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeDocument {
    /// Primary key of the search index
    pub aid: Aid,
    /// The `main` title, empty if the record has none
    #[serde(default)]
    pub main_title: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub official_titles: TitleMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub short_titles: TitleMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub synonymous_titles: TitleMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub kana_titles: TitleMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub card_titles: TitleMap,
}

impl AnimeDocument {
    /// Create an empty document for the given identifier
    pub fn new(aid: impl Into<Aid>) -> Self {
        Self {
            aid: aid.into(),
            ..Default::default()
        }
    }

    /// Iterate over every title in the document, main title first
    #[cfg(test)]
    pub fn all_titles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.main_title.as_str())
            .filter(|t| !t.is_empty())
            .chain(
                [
                    &self.official_titles,
                    &self.short_titles,
                    &self.synonymous_titles,
                    &self.kana_titles,
                    &self.card_titles,
                ]
                .into_iter()
                .flat_map(|map| map.values().flatten().map(String::as_str)),
            )
    }
}

/// A search hit as returned by the engine, with highlighting and ranking score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimeSearchDocument {
    #[serde(flatten)]
    pub document: AnimeDocument,
    /// Copy of the document with matches wrapped in highlight tags
    #[serde(rename = "_formatted", default)]
    pub formatted: Option<AnimeDocument>,
    #[serde(
        rename = "_matchesPosition",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub matches_position: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(
        rename = "_rankingScore",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub ranking_score: Option<f64>,
}

// ============================================================================
// Import metadata
// ============================================================================

/// Metadata describing the last successful import into an index
///
/// Stored as a single document per index in the metadata index, keyed by the
/// target index name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportMetadata {
    /// Name of the index this record describes
    #[serde(default)]
    pub id: String,
    /// Wall-clock time of the import, whole seconds
    pub retrieved_at: DateTime<Utc>,
    /// Generation time reported by the dump itself
    ///
    /// A dump without a readable generation comment leaves this at the Unix
    /// epoch, so `/metadata` shows `1970-01-01T00:00:00Z` rather than year 1.
    pub updated_at: DateTime<Utc>,
    /// Number of anime entries reported by the dump
    pub dump_entries: i64,
    /// Number of titles reported by the dump
    pub dump_titles: i64,
}

impl ImportMetadata {
    /// Metadata for an import retrieved at `retrieved_at`, with no dump-reported values yet
    pub fn retrieved(retrieved_at: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            retrieved_at,
            updated_at: DateTime::<Utc>::default(),
            dump_entries: 0,
            dump_titles: 0,
        }
    }
}
