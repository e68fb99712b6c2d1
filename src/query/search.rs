//! Search execution against the anime index

use super::params::QueryParams;
use crate::engine::{EngineError, SearchEngine, SearchQuery};
use crate::types::AnimeSearchDocument;
use thiserror::Error;
use tracing::debug;

pub const HIGHLIGHT_PRE_TAG: &str = "<span>";
pub const HIGHLIGHT_POST_TAG: &str = "</span>";

/// Errors that can occur when running a search
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Invalid search hit: {0}")]
    InvalidHit(#[from] serde_json::Error),
}

/// One page of search results
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub hits: Vec<AnimeSearchDocument>,
    /// Estimated number of matches across all pages
    pub count: usize,
}

/// Build the engine query for the given parameters
pub fn build_query(params: &QueryParams) -> SearchQuery {
    SearchQuery {
        q: params.query.clone(),
        offset: params.offset,
        limit: params.limit,
        attributes_to_highlight: vec!["*".to_string()],
        highlight_pre_tag: Some(HIGHLIGHT_PRE_TAG.to_string()),
        highlight_post_tag: Some(HIGHLIGHT_POST_TAG.to_string()),
        show_ranking_score: true,
    }
}

/// Run one search on `index`
pub async fn search(
    engine: &dyn SearchEngine,
    index: &str,
    params: &QueryParams,
) -> Result<SearchPage, QueryError> {
    let result = engine.search(index, &build_query(params)).await?;
    debug!(
        "Search {:?} on {}: {} hits of ~{}",
        params.query,
        index,
        result.hits.len(),
        result.estimated_total_hits
    );

    let hits = result
        .hits
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<AnimeSearchDocument>, _>>()?;

    Ok(SearchPage {
        hits,
        count: result.estimated_total_hits,
    })
}
