//! Search handler

use axum::{
    extract::{RawQuery, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};
use url::form_urlencoded;

use super::{plain_error, AppState};
use crate::http::types::QueryResponse;
use crate::query::{self, decode_params, paginate};

/// `GET /search?query=&limit=&offset=`
pub async fn search(
    State(state): State<AppState>,
    uri: Uri,
    RawQuery(raw): RawQuery,
) -> Response {
    let pairs: Vec<(String, String)> = raw
        .as_deref()
        .map(|q| form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    let params = match decode_params(&pairs) {
        Ok(params) => params,
        Err(e) => {
            debug!("Rejected search request: {}", e);
            return plain_error(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    debug!(
        "HTTP search request: query={}, limit={}, offset={}",
        params.query, params.limit, params.offset
    );

    match query::search(state.engine.as_ref(), &state.index_name, &params).await {
        Ok(page) => {
            let paging = paginate(uri.path(), &pairs, &params, page.count);
            (
                StatusCode::OK,
                Json(QueryResponse {
                    payload: page.hits,
                    paging,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Search failed: {}", e);
            plain_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
