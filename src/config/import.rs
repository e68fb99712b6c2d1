//! Dump import configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default user agent for dump downloads
pub const DEFAULT_USER_AGENT: &str = concat!("michiru/", env!("CARGO_PKG_VERSION"));

/// Dump import configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// URL of the gzipped title dump
    pub dump_url: Option<String>,
    /// Timeout for the whole dump download in milliseconds (0 = no timeout)
    pub fetch_timeout_ms: u64,
    /// User-Agent header sent with the dump request
    pub user_agent: String,
    /// Minimum time between two imports in milliseconds
    pub min_interval_ms: u64,
    /// Run the dump validator before parsing
    pub validate_dump: bool,
}

impl ImportConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            dump_url: None,
            fetch_timeout_ms: 30_000,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_interval_ms: 24 * 60 * 60 * 1000,
            validate_dump: true,
        }
    }
}
