//! Import metadata record
//!
//! One document per anime index lives in the metadata index, keyed by the
//! anime index name. A missing record means no import has happened yet.

use super::task::TaskWaiter;
use super::SyncError;
use crate::engine::SearchEngine;
use crate::types::ImportMetadata;
use std::sync::Arc;
use tracing::debug;

/// Reads and writes [`ImportMetadata`] records
#[derive(Clone)]
pub struct MetadataStore {
    engine: Arc<dyn SearchEngine>,
    waiter: TaskWaiter,
    metadata_index: String,
}

impl MetadataStore {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        waiter: TaskWaiter,
        metadata_index: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            waiter,
            metadata_index: metadata_index.into(),
        }
    }

    /// Metadata of the last import into `index_name`, `None` if there was none
    pub async fn get(&self, index_name: &str) -> Result<Option<ImportMetadata>, SyncError> {
        let Some(value) = self
            .engine
            .get_document(&self.metadata_index, index_name)
            .await?
        else {
            debug!("No import metadata for {}", index_name);
            return Ok(None);
        };

        serde_json::from_value(value)
            .map(Some)
            .map_err(SyncError::InvalidMetadata)
    }

    /// Store `metadata` as the record for `index_name`
    pub async fn put(&self, index_name: &str, mut metadata: ImportMetadata) -> Result<(), SyncError> {
        metadata.id = index_name.to_string();
        let document = serde_json::to_value(&metadata).map_err(SyncError::Encode)?;

        let task = self
            .engine
            .add_documents(&self.metadata_index, vec![document])
            .await?;
        self.waiter.wait(task).await?;
        Ok(())
    }
}
