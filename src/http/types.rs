//! HTTP API Response Types

use serde::{Deserialize, Serialize};

use crate::query::PagingEnvelope;
use crate::types::AnimeSearchDocument;

/// `GET /search` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Hits for the requested page
    pub payload: Vec<AnimeSearchDocument>,
    pub paging: PagingEnvelope,
}
