//! Dump validation before parsing
//!
//! The pipeline runs a [`DumpValidator`] over the raw bytes before handing
//! them to the parser. The shipped [`TitleDumpValidator`] checks that the
//! document is well-formed XML with a single `<animetitles>` root.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

/// Dump rejected by a validator
#[derive(Debug, Clone, Error)]
#[error("dump failed validation: {0}")]
pub struct ValidationError(pub String);

/// Validation seam run over the decompressed dump
pub trait DumpValidator: Send + Sync {
    fn validate(&self, bytes: &[u8]) -> Result<(), ValidationError>;
}

/// Well-formedness and root element check for `anime-titles.xml`
#[derive(Debug, Clone)]
pub struct TitleDumpValidator {
    root: String,
}

impl Default for TitleDumpValidator {
    fn default() -> Self {
        Self {
            root: "animetitles".to_string(),
        }
    }
}

impl TitleDumpValidator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DumpValidator for TitleDumpValidator {
    fn validate(&self, bytes: &[u8]) -> Result<(), ValidationError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut depth = 0usize;
        let mut roots = 0usize;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                ValidationError(format!("at byte {}: {}", reader.buffer_position(), e))
            })?;

            match event {
                Event::Start(ref e) | Event::Empty(ref e) if depth == 0 => {
                    roots += 1;
                    if roots > 1 {
                        return Err(ValidationError("more than one root element".to_string()));
                    }
                    let name = e.local_name();
                    if name.as_ref() != self.root.as_bytes() {
                        return Err(ValidationError(format!(
                            "root element is <{}>, expected <{}>",
                            String::from_utf8_lossy(name.as_ref()),
                            self.root
                        )));
                    }
                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                    }
                }
                Event::Start(_) => depth += 1,
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if roots == 0 {
            return Err(ValidationError("document has no root element".to_string()));
        }
        if depth > 0 {
            return Err(ValidationError("unexpected end of input".to_string()));
        }
        Ok(())
    }
}
