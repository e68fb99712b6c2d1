//! michiru: AniDB anime title search
//!
//! Imports AniDB's anime title dump into a Meilisearch index and serves a
//! small read API over it:
//! - Streaming XML import of `anime-titles.xml` with per-record fault tolerance
//! - Delete-then-add index replacement driven by engine task polling
//! - Import metadata record with a minimum interval between downloads
//! - Paginated, highlighted title search over HTTP

pub mod config;
pub mod engine;
pub mod http;
pub mod import;
pub mod index;
pub mod query;
pub mod shutdown;
pub mod types;

pub use config::Config;
pub use types::*;
