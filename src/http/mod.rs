//! HTTP API Server Module
//!
//! Read-only REST API over the anime index: `GET /search` and
//! `GET /metadata`, with the static web UI served as a fallback.

pub mod handlers;
pub mod routes;
pub mod server;
pub mod types;

pub use handlers::AppState;
pub use routes::create_router;
pub use server::HttpServer;
