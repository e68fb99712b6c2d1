//! HTTP API Server
//!
//! Axum-based HTTP server for the michiru read API.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::shutdown::Shutdown;

use super::handlers::AppState;
use super::routes::create_router;

/// HTTP API server
pub struct HttpServer {
    config: ServerConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Router with CORS and tracing layers applied
    pub fn app(&self) -> Router {
        let mut app = create_router(self.state.clone(), Some(&self.config.web_ui_path));

        // Add CORS if enabled
        if self.config.cors_enabled {
            app = app.layer(CorsLayer::permissive());
        }

        app.layer(TraceLayer::new_for_http())
    }

    /// Run the HTTP server until `shutdown` fires
    pub async fn run(&self, shutdown: Shutdown) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .listen_addr()
            .parse()
            .context("Invalid HTTP listen address")?;

        let listener = TcpListener::bind(&addr)
            .await
            .context("Failed to bind HTTP server")?;

        info!("HTTP API server listening on http://{}", addr);

        axum::serve(listener, self.app())
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!("HTTP server shutting down");
            })
            .await
            .context("HTTP server error")?;

        Ok(())
    }
}
