//! Title dump import
//!
//! Turns AniDB's `anime-titles.xml` dump into search documents and pushes
//! them to the search engine.
//!
//! # Example Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use michiru::config::Config;
//! use michiru::engine::MeiliClient;
//! use michiru::import::{DumpInput, ImportPipeline};
//! use michiru::shutdown::Shutdown;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let engine = Arc::new(MeiliClient::new(&config.engine.url, &config.engine.api_key)?);
//! let pipeline = ImportPipeline::new(engine, &config, Shutdown::never());
//!
//! let input = DumpInput::resolve(None, config.import.dump_url.as_deref())?;
//! let stats = pipeline.run(&input).await?;
//! println!("Imported {} documents", stats.documents_imported);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────┐   ┌──────────────┐   ┌──────────────┐   ┌─────────────┐
//! │ IntervalGate  │──▶│ DumpFetcher  │──▶│ DumpValidator│──▶│ DumpParser  │
//! │ (24h policy)  │   │ (HTTP, gzip) │   │ (root check) │   │ (quick-xml) │
//! └───────────────┘   └──────────────┘   └──────────────┘   └─────────────┘
//!                                                                  │
//!                                                                  ▼
//!                                     ┌──────────────────────────────────┐
//!                                     │ IndexSynchronizer::replace       │
//!                                     │ then MetadataStore::put          │
//!                                     └──────────────────────────────────┘
//! ```

pub mod comment;
pub mod fetch;
pub mod gate;
pub mod parser;
pub mod pipeline;
pub mod source;
pub mod transform;
pub mod validate;

// Re-export main types
pub use comment::{extract_generation_info, GenerationInfo};
pub use fetch::{read_dump_file, DumpFetcher, FetchConfig, FetchError};
pub use gate::{IntervalError, IntervalGate, DEFAULT_IMPORT_INTERVAL};
pub use parser::{DumpParser, ParsedDump};
pub use pipeline::{DumpInput, ImportPipeline, PipelineError};
pub use source::{ImportError, ImportStats, RawRecord, RawTitle};
pub use transform::to_document;
pub use validate::{DumpValidator, TitleDumpValidator, ValidationError};
