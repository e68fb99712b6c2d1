pub mod import;
pub mod reset;
pub mod serve;

use std::sync::Arc;

use anyhow::{Context, Result};
use michiru::config::Config;
use michiru::engine::{MeiliClient, SearchEngine};
use tracing::debug;

/// Build the engine client shared by every component of a command
pub fn connect(config: &Config) -> Result<Arc<dyn SearchEngine>> {
    let client = MeiliClient::new(&config.engine.url, &config.engine.api_key)
        .context("Failed to create Meilisearch client")?;
    debug!("Using Meilisearch at {}", client.base_url());
    Ok(Arc::new(client))
}
