//! HTTP API Request Handlers

mod metadata;
mod search;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::config::EngineConfig;
use crate::engine::SearchEngine;
use crate::index::{MetadataStore, TaskWaiter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn SearchEngine>,
    /// Anime index queried by `/search`
    pub index_name: Arc<str>,
    pub metadata: MetadataStore,
}

impl AppState {
    pub fn new(engine: Arc<dyn SearchEngine>, config: &EngineConfig) -> Self {
        let waiter = TaskWaiter::new(engine.clone())
            .with_timeout(config.task_timeout())
            .with_poll_interval(config.task_poll_interval());
        let metadata = MetadataStore::new(engine.clone(), waiter, &config.metadata_index);

        Self {
            engine,
            index_name: Arc::from(config.index_name.as_str()),
            metadata,
        }
    }
}

/// Plain-text error response
fn plain_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, message.into()).into_response()
}

// Re-export all handlers
pub use metadata::{cache_headers, metadata, CacheHeaders, METADATA_VALIDITY};
pub use search::search;
