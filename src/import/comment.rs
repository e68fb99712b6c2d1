//! Generation info carried in the dump's header comment
//!
//! AniDB writes a comment like
//! `<!-- Created: Sat Jan 11 02:00:02 2025 (13802 anime, 73104 titles) -->`
//! at the top of the dump. The format is informal, so extraction is
//! best-effort: a comment that matches yields values with unparsable pieces
//! defaulted, a comment that does not match yields nothing.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

const GENERATION_PATTERN: &str = r": (.*) \((\d*)\D*(\d*)";
const GENERATION_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Values recovered from the generation comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationInfo {
    /// Dump generation time; the Unix epoch if unparsable
    pub updated_at: DateTime<Utc>,
    /// Number of anime entries; zero if unparsable
    pub entries: i64,
    /// Number of titles; zero if unparsable
    pub titles: i64,
}

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(GENERATION_PATTERN).expect("generation pattern is valid"))
}

/// Match a comment body against the generation pattern
pub fn extract_generation_info(comment: &str) -> Option<GenerationInfo> {
    let captures = pattern().captures(comment)?;
    let group = |i: usize| captures.get(i).map(|m| m.as_str()).unwrap_or("");

    Some(GenerationInfo {
        updated_at: parse_generation_time(group(1)).unwrap_or_default(),
        entries: group(2).parse().unwrap_or(0),
        titles: group(3).parse().unwrap_or(0),
    })
}

/// Parse `Sat Jan 11 02:00:02 2025` as UTC
fn parse_generation_time(value: &str) -> Option<DateTime<Utc>> {
    let normalized = value.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, GENERATION_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_anidb_header() {
        let info =
            extract_generation_info(" Created: Sat Jan 11 02:00:02 2025 (13802 anime, 73104 titles) ")
                .unwrap();
        assert_eq!(
            info.updated_at,
            Utc.with_ymd_and_hms(2025, 1, 11, 2, 0, 2).unwrap()
        );
        assert_eq!(info.entries, 13802);
        assert_eq!(info.titles, 73104);
    }

    #[test]
    fn test_single_digit_day() {
        let info =
            extract_generation_info("Created: Fri Jan  3 02:00:01 2025 (1 anime, 2 titles)").unwrap();
        assert_eq!(
            info.updated_at,
            Utc.with_ymd_and_hms(2025, 1, 3, 2, 0, 1).unwrap()
        );
    }

    #[test]
    fn test_unparsable_pieces_default() {
        let info = extract_generation_info("Created: yesterday-ish (many anime)").unwrap();
        assert_eq!(info.updated_at, DateTime::<Utc>::default());
        assert_eq!(info.entries, 0);
        assert_eq!(info.titles, 0);
    }

    #[test]
    fn test_non_matching_comment() {
        assert!(extract_generation_info("just a comment").is_none());
        assert!(extract_generation_info("").is_none());
    }
}
