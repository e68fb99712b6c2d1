//! Core types for dump import

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One `<title>` entry of an `<anime>` record, as found in the dump
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTitle {
    /// Value of the `type` attribute (`main`, `official`, `syn`, ...)
    pub kind: String,
    /// Value of the `lang` attribute, empty if missing
    pub language: String,
    /// Character data of the element
    pub text: String,
}

impl RawTitle {
    pub fn new(kind: impl Into<String>, language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            language: language.into(),
            text: text.into(),
        }
    }
}

/// One `<anime>` record, titles in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub aid: u64,
    pub titles: Vec<RawTitle>,
}

impl RawRecord {
    pub fn new(aid: u64) -> Self {
        Self {
            aid,
            titles: Vec::new(),
        }
    }

    /// Append a title entry
    pub fn with_title(mut self, kind: &str, language: &str, text: &str) -> Self {
        self.titles.push(RawTitle::new(kind, language, text));
        self
    }
}

/// Import statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportStats {
    /// Documents produced by the parser and sent to the index
    pub documents_imported: usize,
    /// `<anime>` records skipped because of shape problems
    pub records_skipped: usize,
    /// Size of the decompressed dump
    pub bytes_processed: u64,
    /// Processing time in seconds
    pub elapsed_seconds: f64,
    /// Documents per second over the whole run
    pub docs_per_second: f64,
}

impl ImportStats {
    /// Calculate documents per second
    pub fn update_rate(&mut self) {
        if self.elapsed_seconds > 0.0 {
            self.docs_per_second = self.documents_imported as f64 / self.elapsed_seconds;
        }
    }
}

/// Errors that can occur while reading a dump
#[derive(Debug, Error)]
pub enum ImportError {
    /// Lexical error; the dump cannot be read any further
    #[error("XML parse error at byte {position}: {message}")]
    Xml { position: usize, message: String },
}
