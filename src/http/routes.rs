//! HTTP API Route Definitions

use std::path::Path;

use axum::{routing::get, Router};
use tower_http::services::ServeDir;
use tracing::{debug, info};

use super::handlers::{self, AppState};

/// Create the API router
///
/// When `web_ui` points at an existing directory its files are served for
/// every path the API does not claim.
pub fn create_router(app_state: AppState, web_ui: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/search", get(handlers::search))
        .route("/metadata", get(handlers::metadata))
        .with_state(app_state);

    match web_ui {
        Some(path) if path.is_dir() => {
            info!("Serving web UI from {}", path.display());
            router.fallback_service(ServeDir::new(path))
        }
        Some(path) => {
            debug!("Web UI directory {} not found, not serving it", path.display());
            router
        }
        None => router,
    }
}
