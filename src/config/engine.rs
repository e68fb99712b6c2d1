//! Search engine connection configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Search engine connection and index naming
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the Meilisearch instance
    pub url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Primary index holding the anime documents
    pub index_name: String,
    /// Index holding one import metadata record per primary index
    pub metadata_index: String,
    /// Upper bound on each task wait in milliseconds (0 = wait indefinitely)
    pub task_timeout_ms: u64,
    /// Delay between task status polls in milliseconds
    pub task_poll_interval_ms: u64,
}

impl EngineConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn task_poll_interval(&self) -> Duration {
        Duration::from_millis(self.task_poll_interval_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            index_name: "titles".to_string(),
            metadata_index: "index_metadata".to_string(),
            task_timeout_ms: 0,
            task_poll_interval_ms: 50,
        }
    }
}
