//! Search request parameters

use thiserror::Error;

/// Default page size
pub const DEFAULT_LIMIT: usize = 10;

/// Largest page size a client may ask for
pub const MAX_LIMIT: usize = 50;

/// Decoded `/search` parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub query: String,
    pub limit: usize,
    pub offset: usize,
}

impl QueryParams {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Client error in the request parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("query cannot be empty")]
    MissingQuery,
    #[error("limit must be an integer: {0:?}")]
    InvalidLimit(String),
    #[error("limit must be between 1 and {MAX_LIMIT}")]
    LimitOutOfRange,
    #[error("offset must be an integer: {0:?}")]
    InvalidOffset(String),
    #[error("offset cannot be negative")]
    NegativeOffset,
}

/// First value of `key`, if any
fn first<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Decode `query`, `limit` and `offset` from the request's query pairs
///
/// Empty `limit` or `offset` values count as absent.
pub fn decode_params(pairs: &[(String, String)]) -> Result<QueryParams, ParamError> {
    let query = match first(pairs, "query") {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return Err(ParamError::MissingQuery),
    };

    let limit = match first(pairs, "limit").filter(|v| !v.is_empty()) {
        None => DEFAULT_LIMIT,
        Some(raw) => {
            let value: i64 = raw
                .parse()
                .map_err(|_| ParamError::InvalidLimit(raw.to_string()))?;
            if value < 1 || value > MAX_LIMIT as i64 {
                return Err(ParamError::LimitOutOfRange);
            }
            value as usize
        }
    };

    let offset = match first(pairs, "offset").filter(|v| !v.is_empty()) {
        None => 0,
        Some(raw) => {
            let value: i64 = raw
                .parse()
                .map_err(|_| ParamError::InvalidOffset(raw.to_string()))?;
            usize::try_from(value).map_err(|_| ParamError::NegativeOffset)?
        }
    };

    Ok(QueryParams {
        query,
        limit,
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let params = decode_params(&pairs(&[("query", "bebop")])).unwrap();
        assert_eq!(params, QueryParams::new("bebop"));
        assert_eq!(params.limit, 10);
        assert_eq!(params.offset, 0);
    }

    #[test]
    fn test_explicit_values() {
        let params =
            decode_params(&pairs(&[("offset", "20"), ("query", "gundam"), ("limit", "50")]))
                .unwrap();
        assert_eq!(params, QueryParams::new("gundam").with_limit(50).with_offset(20));
    }

    #[test]
    fn test_missing_or_empty_query() {
        assert_eq!(decode_params(&[]), Err(ParamError::MissingQuery));
        assert_eq!(
            decode_params(&pairs(&[("query", "")])),
            Err(ParamError::MissingQuery)
        );
    }

    #[test]
    fn test_first_value_wins() {
        let params = decode_params(&pairs(&[("query", "a"), ("query", "b")])).unwrap();
        assert_eq!(params.query, "a");
    }

    #[test]
    fn test_limit_bounds() {
        assert!(matches!(
            decode_params(&pairs(&[("query", "a"), ("limit", "ten")])),
            Err(ParamError::InvalidLimit(_))
        ));
        assert_eq!(
            decode_params(&pairs(&[("query", "a"), ("limit", "51")])),
            Err(ParamError::LimitOutOfRange)
        );
        assert_eq!(
            decode_params(&pairs(&[("query", "a"), ("limit", "0")])),
            Err(ParamError::LimitOutOfRange)
        );
        assert!(decode_params(&pairs(&[("query", "a"), ("limit", "1")])).is_ok());
    }

    #[test]
    fn test_offset_validation() {
        assert!(matches!(
            decode_params(&pairs(&[("query", "a"), ("offset", "1.5")])),
            Err(ParamError::InvalidOffset(_))
        ));
        assert_eq!(
            decode_params(&pairs(&[("query", "a"), ("offset", "-10")])),
            Err(ParamError::NegativeOffset)
        );
    }
}
