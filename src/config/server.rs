//! HTTP API server configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HTTP API server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, without the port
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Directory of the static web UI, served when it exists
    pub web_ui_path: PathBuf,
    /// Enable permissive CORS (useful for browser-based clients on another origin)
    pub cors_enabled: bool,
}

impl ServerConfig {
    /// `host:port` listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            web_ui_path: PathBuf::from("./static"),
            cors_enabled: false,
        }
    }
}
