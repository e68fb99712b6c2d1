//! Pagination envelope for search responses

use super::params::QueryParams;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Total count plus links to the neighbouring pages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingEnvelope {
    /// Estimated number of matches
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<String>,
}

/// Build the paging envelope for one page of results
///
/// `pairs` are the request's query pairs; the links keep them all, with
/// `query` and `limit` set to the decoded values and `offset` moved. Keys are
/// encoded in sorted order.
pub fn paginate(
    path: &str,
    pairs: &[(String, String)],
    params: &QueryParams,
    count: usize,
) -> PagingEnvelope {
    let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in pairs {
        values.entry(key.clone()).or_default().push(value.clone());
    }
    values.insert("query".to_string(), vec![params.query.clone()]);
    values.insert("limit".to_string(), vec![params.limit.to_string()]);

    let link = |offset: usize| {
        let mut values = values.clone();
        values.insert("offset".to_string(), vec![offset.to_string()]);

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, entries) in &values {
            for value in entries {
                serializer.append_pair(key, value);
            }
        }
        format!("{}?{}", path, serializer.finish())
    };

    let next_offset = params.offset + params.limit;
    let next = (next_offset < count).then(|| link(next_offset));

    let prev = (params.offset > 0).then(|| link(params.offset.saturating_sub(params.limit)));

    PagingEnvelope { count, next, prev }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(query: &str, limit: usize, offset: usize) -> (Vec<(String, String)>, QueryParams) {
        let pairs = vec![
            ("query".to_string(), query.to_string()),
            ("limit".to_string(), limit.to_string()),
            ("offset".to_string(), offset.to_string()),
        ];
        let params = QueryParams::new(query).with_limit(limit).with_offset(offset);
        (pairs, params)
    }

    #[test]
    fn test_no_results() {
        let (pairs, params) = request("x", 10, 0);
        let paging = paginate("/search", &pairs, &params, 0);
        assert_eq!(paging, PagingEnvelope::default());
    }

    #[test]
    fn test_first_page() {
        let (pairs, params) = request("bebop", 10, 0);
        let paging = paginate("/search", &pairs, &params, 25);
        assert_eq!(paging.count, 25);
        assert_eq!(
            paging.next.as_deref(),
            Some("/search?limit=10&offset=10&query=bebop")
        );
        assert!(paging.prev.is_none());
    }

    #[test]
    fn test_last_page() {
        let (pairs, params) = request("bebop", 10, 20);
        let paging = paginate("/search", &pairs, &params, 25);
        assert!(paging.next.is_none());
        assert_eq!(
            paging.prev.as_deref(),
            Some("/search?limit=10&offset=10&query=bebop")
        );
    }

    #[test]
    fn test_prev_clamps_to_zero() {
        let (pairs, params) = request("bebop", 10, 5);
        let paging = paginate("/search", &pairs, &params, 25);
        assert_eq!(
            paging.prev.as_deref(),
            Some("/search?limit=10&offset=0&query=bebop")
        );
        assert_eq!(
            paging.next.as_deref(),
            Some("/search?limit=10&offset=15&query=bebop")
        );
    }

    #[test]
    fn test_keeps_other_params_and_encodes() {
        let pairs = vec![
            ("query".to_string(), "cowboy bebop".to_string()),
            ("lang".to_string(), "en&ja".to_string()),
        ];
        let params = QueryParams::new("cowboy bebop");
        let paging = paginate("/search", &pairs, &params, 30);
        assert_eq!(
            paging.next.as_deref(),
            Some("/search?lang=en%26ja&limit=10&offset=10&query=cowboy+bebop")
        );
    }

    #[test]
    fn test_json_omits_missing_links() {
        let json = serde_json::to_value(PagingEnvelope {
            count: 3,
            next: None,
            prev: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"count": 3}));
    }
}
