//! One importer run, from dump source to stored metadata

use super::fetch::{read_dump_file, DumpFetcher, FetchConfig, FetchError};
use super::gate::{IntervalError, IntervalGate};
use super::parser::DumpParser;
use super::source::{ImportError, ImportStats};
use super::validate::{DumpValidator, TitleDumpValidator, ValidationError};
use crate::config::Config;
use crate::engine::SearchEngine;
use crate::index::{IndexSynchronizer, MetadataStore, SyncError, TaskWaiter};
use crate::shutdown::Shutdown;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where the dump bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpInput {
    /// Download from the dump server
    Url(String),
    /// Read a local copy, gzipped or not
    File(PathBuf),
}

impl DumpInput {
    /// A local file takes precedence over the configured URL
    pub fn resolve(
        dump_file: Option<PathBuf>,
        dump_url: Option<&str>,
    ) -> Result<Self, PipelineError> {
        match (dump_file, dump_url) {
            (Some(path), _) => Ok(Self::File(path)),
            (None, Some(url)) if !url.is_empty() => Ok(Self::Url(url.to_string())),
            _ => Err(PipelineError::MissingDumpUrl),
        }
    }
}

/// Errors that can occur during an import run, tagged with the failing stage
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No dump source: set TITLE_DUMP_URL or pass --dump-file")]
    MissingDumpUrl,

    #[error("Index setup failed: {0}")]
    Setup(#[source] SyncError),

    #[error("Reading import metadata failed: {0}")]
    ReadMetadata(#[source] SyncError),

    #[error("Import refused: {0}")]
    TooSoon(#[from] IntervalError),

    #[error("Fetching dump failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Validating dump failed: {0}")]
    Validate(#[from] ValidationError),

    #[error("Parsing dump failed: {0}")]
    Parse(#[from] ImportError),

    #[error("Import cancelled before replacing documents")]
    Cancelled,

    #[error("Replacing documents failed: {0}")]
    Replace(#[source] SyncError),

    #[error("Writing import metadata failed: {0}")]
    WriteMetadata(#[source] SyncError),
}

/// Runs the importer against one search engine
pub struct ImportPipeline {
    synchronizer: IndexSynchronizer,
    metadata: MetadataStore,
    gate: IntervalGate,
    fetch_config: FetchConfig,
    validator: Option<Box<dyn DumpValidator>>,
    parser: DumpParser,
    shutdown: Shutdown,
}

impl ImportPipeline {
    /// Build a pipeline from the loaded configuration
    ///
    /// Task waits and the download are aborted when `shutdown` fires.
    pub fn new(engine: Arc<dyn SearchEngine>, config: &Config, shutdown: Shutdown) -> Self {
        let waiter = TaskWaiter::new(engine.clone())
            .with_timeout(config.engine.task_timeout())
            .with_poll_interval(config.engine.task_poll_interval())
            .with_shutdown(shutdown.clone());

        let synchronizer = IndexSynchronizer::new(
            engine.clone(),
            waiter.clone(),
            &config.engine.index_name,
            &config.engine.metadata_index,
        );
        let metadata = MetadataStore::new(engine, waiter, &config.engine.metadata_index);

        let validator: Option<Box<dyn DumpValidator>> = if config.import.validate_dump {
            Some(Box::new(TitleDumpValidator::new()))
        } else {
            None
        };

        Self {
            synchronizer,
            metadata,
            gate: IntervalGate::new(config.import.min_interval()),
            fetch_config: FetchConfig {
                user_agent: config.import.user_agent.clone(),
                timeout: config.import.fetch_timeout(),
            },
            validator,
            parser: DumpParser::new(),
            shutdown,
        }
    }

    pub fn with_gate(mut self, gate: IntervalGate) -> Self {
        self.gate = gate;
        self
    }

    /// Replace the dump validator (`None` disables validation)
    pub fn with_validator(mut self, validator: Option<Box<dyn DumpValidator>>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_parser(mut self, parser: DumpParser) -> Self {
        self.parser = parser;
        self
    }

    /// Run one import
    ///
    /// Nothing is fetched when the previous import is too recent. A failure
    /// after the delete phase leaves the index as the engine last saw it.
    pub async fn run(&self, input: &DumpInput) -> Result<ImportStats, PipelineError> {
        let start = Instant::now();
        let index_name = self.synchronizer.index_name();

        self.synchronizer
            .ensure_indexes()
            .await
            .map_err(PipelineError::Setup)?;

        let previous = self
            .metadata
            .get(index_name)
            .await
            .map_err(PipelineError::ReadMetadata)?;
        if let Err(e) = self.gate.check(previous.as_ref()) {
            warn!("{}", e);
            return Err(e.into());
        }

        let bytes = match input {
            DumpInput::Url(url) => {
                let fetcher = DumpFetcher::new(self.fetch_config.clone())?;
                fetcher.fetch(url, &self.shutdown).await?
            }
            DumpInput::File(path) => read_dump_file(path).await?,
        };

        if let Some(validator) = &self.validator {
            validator.validate(&bytes)?;
            debug!("Dump passed validation");
        }

        let parsed = self.parser.parse(&bytes)?;
        info!(
            "Parsed {} documents ({} skipped), dump reports {} entries",
            parsed.documents.len(),
            parsed.skipped,
            parsed.metadata.dump_entries
        );

        if self.shutdown.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        self.synchronizer
            .replace(&parsed.documents)
            .await
            .map_err(PipelineError::Replace)?;

        self.metadata
            .put(index_name, parsed.metadata)
            .await
            .map_err(PipelineError::WriteMetadata)?;

        let mut stats = ImportStats {
            documents_imported: parsed.documents.len(),
            records_skipped: parsed.skipped,
            bytes_processed: bytes.len() as u64,
            elapsed_seconds: start.elapsed().as_secs_f64(),
            docs_per_second: 0.0,
        };
        stats.update_rate();

        info!(
            "Imported {} documents into {} in {:.2}s",
            stats.documents_imported, index_name, stats.elapsed_seconds
        );
        Ok(stats)
    }
}
