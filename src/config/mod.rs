//! Configuration for michiru

mod engine;
mod env;
mod import;
mod logging;
mod server;

pub use engine::EngineConfig;
pub use env::{apply_value, parse_duration, ConfigBuilder, EnvKey, EnvOption, ENV_OPTIONS};
pub use import::{ImportConfig, DEFAULT_USER_AGENT};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use server::ServerConfig;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Search engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Dump import configuration
    #[serde(default)]
    pub import: ImportConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file, then apply the environment.
    pub fn load(path: &Path) -> Result<Self> {
        ConfigBuilder::new().with_file(path).build()
    }

    /// Load configuration from the environment only.
    pub fn from_env() -> Result<Self> {
        ConfigBuilder::new().build()
    }

    /// Deserialize a TOML file without validating it
    pub(crate) fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together.
    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }

    pub(crate) fn validation_errors(&self) -> Vec<String> {
        let mut errors: Vec<String> = Vec::new();

        // Server
        if self.server.port == 0 {
            errors.push("server port must be between 1 and 65535".to_string());
        }
        if self.server.host.is_empty() {
            errors.push("server host must not be empty".to_string());
        }

        // Engine
        if !self.engine.url.is_empty() {
            match Url::parse(&self.engine.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => errors.push(format!(
                    "engine url must use http or https, got '{}'",
                    url.scheme()
                )),
                Err(e) => errors.push(format!("engine url '{}' is invalid: {}", self.engine.url, e)),
            }
        }
        if self.engine.index_name.is_empty() {
            errors.push("index_name must not be empty".to_string());
        }
        if self.engine.metadata_index.is_empty() {
            errors.push("metadata_index must not be empty".to_string());
        }
        if !self.engine.index_name.is_empty()
            && self.engine.index_name == self.engine.metadata_index
        {
            errors.push(format!(
                "index_name and metadata_index must differ (both are '{}')",
                self.engine.index_name
            ));
        }
        if self.engine.task_poll_interval_ms == 0 {
            errors.push("task_poll_interval must be positive".to_string());
        }

        // Import
        if let Some(dump_url) = &self.import.dump_url {
            match Url::parse(dump_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(_) => errors.push(format!("dump url '{}' must use http or https", dump_url)),
                Err(e) => errors.push(format!("dump url '{}' is invalid: {}", dump_url, e)),
            }
        }
        if self.import.user_agent.trim().is_empty() {
            errors.push("user_agent must not be empty".to_string());
        }

        errors
    }
}
