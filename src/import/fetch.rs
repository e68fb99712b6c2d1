//! Dump download and decompression

use crate::shutdown::Shutdown;
use flate2::read::GzDecoder;
use reqwest::header::{CACHE_CONTROL, USER_AGENT};
use reqwest::StatusCode;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// First two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors that can occur while obtaining the dump
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Dump server answered {0}")]
    Status(StatusCode),
    #[error("Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Decompression error: {0}")]
    Decompression(std::io::Error),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Fetch cancelled by shutdown")]
    Cancelled,
}

/// Configuration for the dump fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,
    /// Timeout for the whole download (zero = none)
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Downloads the gzipped title dump
#[derive(Debug, Clone)]
pub struct DumpFetcher {
    http_client: reqwest::Client,
    config: FetchConfig,
}

impl DumpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder();
        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }
        let http_client = builder.build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Download and decompress the dump at `url`
    ///
    /// Any status other than 200 is an error. Shutdown aborts the download.
    pub async fn fetch(&self, url: &str, shutdown: &Shutdown) -> Result<Vec<u8>, FetchError> {
        info!("Fetching dump from {}", url);
        let start = Instant::now();

        let download = async {
            let response = self
                .http_client
                .get(url)
                .header(CACHE_CONTROL, "no-cache")
                .header(USER_AGENT, &self.config.user_agent)
                .send()
                .await?;

            let status = response.status();
            if status != StatusCode::OK {
                return Err(FetchError::Status(status));
            }
            Ok(response.bytes().await?)
        };

        let compressed = tokio::select! {
            result = download => result.map_err(|e| self.classify(e))?,
            _ = shutdown.cancelled() => return Err(FetchError::Cancelled),
        };

        debug!(
            "Downloaded {} bytes in {:.2}s",
            compressed.len(),
            start.elapsed().as_secs_f64()
        );

        gunzip(&compressed)
    }

    fn classify(&self, error: FetchError) -> FetchError {
        match error {
            FetchError::Http(e) if e.is_timeout() => FetchError::Timeout(self.config.timeout),
            other => other,
        }
    }
}

/// Decompress a gzip stream in full
pub fn gunzip(compressed: &[u8]) -> Result<Vec<u8>, FetchError> {
    let mut decoder = GzDecoder::new(compressed);
    let mut out = Vec::with_capacity(compressed.len() * 8);
    decoder
        .read_to_end(&mut out)
        .map_err(FetchError::Decompression)?;
    Ok(out)
}

/// Whether the bytes start with the gzip magic number
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Read a dump from disk, decompressing it if it is gzipped
pub async fn read_dump_file(path: &Path) -> Result<Vec<u8>, FetchError> {
    info!("Reading dump from {}", path.display());
    let bytes = tokio::fs::read(path).await.map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if is_gzip(&bytes) {
        gunzip(&bytes)
    } else {
        Ok(bytes)
    }
}
