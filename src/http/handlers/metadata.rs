//! Import metadata handler

use std::time::Duration;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use tracing::error;

use super::{plain_error, AppState};

/// How long a served import stays fresh; the importer runs daily
pub const METADATA_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// IMF-fixdate, as used by `Expires` and `Last-Modified`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Caching headers for one metadata response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeaders {
    pub cache_control: String,
    pub expires: String,
    pub last_modified: String,
}

/// Headers for a record retrieved at `retrieved_at`, as seen at `now`
///
/// `max-age` counts down to `retrieved_at + METADATA_VALIDITY` and stays at
/// zero once that has passed.
pub fn cache_headers(retrieved_at: DateTime<Utc>, now: DateTime<Utc>) -> CacheHeaders {
    let validity = chrono::Duration::seconds(METADATA_VALIDITY.as_secs() as i64);
    let expires = retrieved_at + validity;
    let max_age = (expires - now).num_seconds().max(0);

    CacheHeaders {
        cache_control: format!("public, max-age={}", max_age),
        expires: expires.format(HTTP_DATE_FORMAT).to_string(),
        last_modified: retrieved_at.format(HTTP_DATE_FORMAT).to_string(),
    }
}

/// `GET /metadata`
pub async fn metadata(State(state): State<AppState>) -> Response {
    match state.metadata.get(&state.index_name).await {
        Ok(Some(meta)) => {
            let headers = cache_headers(meta.retrieved_at, Utc::now());
            (
                StatusCode::OK,
                [
                    (header::CACHE_CONTROL, headers.cache_control),
                    (header::EXPIRES, headers.expires),
                    (header::LAST_MODIFIED, headers.last_modified),
                ],
                Json(meta),
            )
                .into_response()
        }
        Ok(None) => plain_error(StatusCode::NOT_FOUND, "no import has completed yet"),
        Err(e) => {
            error!("Reading import metadata failed: {}", e);
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
