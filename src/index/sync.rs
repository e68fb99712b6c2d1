//! Index setup and replacement

use super::task::TaskWaiter;
use super::SyncError;
use crate::engine::{IndexSettings, SearchEngine};
use crate::types::AnimeDocument;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Primary key of the anime index
pub const ANIME_PRIMARY_KEY: &str = "aid";

/// Primary key of the metadata index
pub const METADATA_PRIMARY_KEY: &str = "id";

/// Page size used when listing indexes
pub const INDEX_LIST_PAGE_SIZE: usize = 20;

/// Settings applied to a newly created anime index
pub fn anime_index_settings() -> IndexSettings {
    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    IndexSettings {
        displayed_attributes: Some(strings(&[
            "aid",
            "mainTitle",
            "officialTitles",
            "shortTitles",
            "synonymousTitles",
            "kanaTitles",
            "cardTitles",
        ])),
        searchable_attributes: Some(strings(&[
            "mainTitle",
            "officialTitles",
            "shortTitles",
            "synonymousTitles",
            "kanaTitles",
            "cardTitles",
        ])),
        ranking_rules: Some(strings(&[
            "words",
            "exactness",
            "attribute",
            "typo",
            "proximity",
            "sort",
        ])),
    }
}

/// Drives index creation and replacement on the search engine
#[derive(Clone)]
pub struct IndexSynchronizer {
    engine: Arc<dyn SearchEngine>,
    waiter: TaskWaiter,
    index_name: String,
    metadata_index: String,
}

impl IndexSynchronizer {
    pub fn new(
        engine: Arc<dyn SearchEngine>,
        waiter: TaskWaiter,
        index_name: impl Into<String>,
        metadata_index: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            waiter,
            index_name: index_name.into(),
            metadata_index: metadata_index.into(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Create the anime and metadata indexes if they do not exist
    ///
    /// A new anime index gets its settings applied before returning. Failing
    /// to look an index up is an error, not a reason to create it.
    pub async fn ensure_indexes(&self) -> Result<(), SyncError> {
        if self.engine.get_index(&self.index_name).await?.is_none() {
            info!("Creating index {}", self.index_name);
            let task = self
                .engine
                .create_index(&self.index_name, ANIME_PRIMARY_KEY)
                .await?;
            self.waiter.wait(task).await?;

            let task = self
                .engine
                .update_settings(&self.index_name, &anime_index_settings())
                .await?;
            self.waiter.wait(task).await?;
        }

        if self.engine.get_index(&self.metadata_index).await?.is_none() {
            info!("Creating index {}", self.metadata_index);
            let task = self
                .engine
                .create_index(&self.metadata_index, METADATA_PRIMARY_KEY)
                .await?;
            self.waiter.wait(task).await?;
        }

        Ok(())
    }

    /// Replace every document in the anime index
    ///
    /// Deletes all documents, then adds the new set. The add is only
    /// submitted once the delete has succeeded; the index is empty in between.
    pub async fn replace(&self, documents: &[AnimeDocument]) -> Result<(), SyncError> {
        let payload = documents
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(SyncError::Encode)?;

        let start = Instant::now();
        info!("Deleting all documents from {}", self.index_name);
        let task = self.engine.delete_all_documents(&self.index_name).await?;
        self.waiter.wait(task).await?;

        info!("Adding {} documents to {}", payload.len(), self.index_name);
        let task = self.engine.add_documents(&self.index_name, payload).await?;
        self.waiter.wait(task).await?;

        debug!(
            "Replaced documents in {} in {:.2}s",
            self.index_name,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }

    /// Delete every index on the engine, returning how many were deleted
    pub async fn reset_all(&self) -> Result<usize, SyncError> {
        let mut uids = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.engine.list_indexes(offset, INDEX_LIST_PAGE_SIZE).await?;
            let fetched = page.results.len();
            uids.extend(page.results.into_iter().map(|index| index.uid));
            offset += fetched;
            if fetched == 0 || offset >= page.total {
                break;
            }
        }

        for uid in &uids {
            info!("Deleting index {}", uid);
            let task = self.engine.delete_index(uid).await?;
            self.waiter.wait(task).await?;
        }

        Ok(uids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MemoryEngine, TaskKind};
    use std::time::Duration;

    fn synchronizer(engine: &Arc<MemoryEngine>) -> IndexSynchronizer {
        let waiter = TaskWaiter::new(engine.clone()).with_poll_interval(Duration::from_millis(1));
        IndexSynchronizer::new(engine.clone(), waiter, "titles", "index_metadata")
    }

    fn documents(n: u64) -> Vec<AnimeDocument> {
        (1..=n)
            .map(|aid| {
                let mut doc = AnimeDocument::new(aid);
                doc.main_title = format!("Anime {}", aid);
                doc
            })
            .collect()
    }

    #[tokio::test]
    async fn test_ensure_indexes_creates_and_configures() {
        let engine = Arc::new(MemoryEngine::new());
        let sync = synchronizer(&engine);

        sync.ensure_indexes().await.unwrap();

        let titles = engine.get_index("titles").await.unwrap().unwrap();
        assert_eq!(titles.primary_key.as_deref(), Some("aid"));
        let meta = engine.get_index("index_metadata").await.unwrap().unwrap();
        assert_eq!(meta.primary_key.as_deref(), Some("id"));
        assert_eq!(engine.settings("titles"), Some(anime_index_settings()));
    }

    #[tokio::test]
    async fn test_ensure_indexes_is_idempotent() {
        let engine = Arc::new(MemoryEngine::new());
        let sync = synchronizer(&engine);

        sync.ensure_indexes().await.unwrap();
        sync.ensure_indexes().await.unwrap();

        let creates = engine
            .calls()
            .iter()
            .filter(|c| c.starts_with("create_index"))
            .count();
        assert_eq!(creates, 2);
    }

    #[tokio::test]
    async fn test_ensure_indexes_propagates_lookup_failure() {
        let engine = Arc::new(MemoryEngine::new());
        engine.fail_reads(503, "unavailable");
        let sync = synchronizer(&engine);

        let err = sync.ensure_indexes().await.unwrap_err();
        assert!(matches!(err, SyncError::Engine(_)));
        assert!(!engine.calls().iter().any(|c| c.starts_with("create_index")));
    }

    #[tokio::test]
    async fn test_ensure_indexes_stops_on_failed_task() {
        let engine = Arc::new(MemoryEngine::new());
        engine.fail_tasks(TaskKind::SettingsUpdate);
        let sync = synchronizer(&engine);

        let err = sync.ensure_indexes().await.unwrap_err();
        assert!(matches!(err, SyncError::TaskFailed { .. }));
        // Setup stopped before the metadata index
        assert!(engine.get_index("index_metadata").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_swaps_documents() {
        let engine = Arc::new(MemoryEngine::new());
        let sync = synchronizer(&engine);
        sync.ensure_indexes().await.unwrap();

        sync.replace(&documents(5)).await.unwrap();
        assert_eq!(engine.document_count("titles"), 5);

        sync.replace(&documents(2)).await.unwrap();
        assert_eq!(engine.document_count("titles"), 2);
    }

    #[tokio::test]
    async fn test_failed_delete_skips_add() {
        let engine = Arc::new(MemoryEngine::new());
        let sync = synchronizer(&engine);
        sync.ensure_indexes().await.unwrap();
        sync.replace(&documents(3)).await.unwrap();

        engine.fail_tasks(TaskKind::DocumentDeletion);
        let before = engine
            .calls()
            .iter()
            .filter(|c| c.starts_with("add_documents"))
            .count();

        let err = sync.replace(&documents(10)).await.unwrap_err();
        assert!(matches!(err, SyncError::TaskFailed { .. }));

        let after = engine
            .calls()
            .iter()
            .filter(|c| c.starts_with("add_documents"))
            .count();
        assert_eq!(before, after);
        assert_eq!(engine.document_count("titles"), 3);
    }

    #[tokio::test]
    async fn test_failed_add_leaves_index_empty() {
        let engine = Arc::new(MemoryEngine::new());
        let sync = synchronizer(&engine);
        sync.ensure_indexes().await.unwrap();
        sync.replace(&documents(3)).await.unwrap();

        engine.fail_tasks(TaskKind::DocumentAdditionOrUpdate);
        assert!(sync.replace(&documents(4)).await.is_err());
        assert_eq!(engine.document_count("titles"), 0);
    }

    #[tokio::test]
    async fn test_reset_all_pages_through_listing() {
        let engine = Arc::new(MemoryEngine::new());
        for i in 0..45 {
            engine.create_index(&format!("index_{:02}", i), "id").await.unwrap();
        }
        let sync = synchronizer(&engine);

        let deleted = sync.reset_all().await.unwrap();
        assert_eq!(deleted, 45);

        let listings = engine
            .calls()
            .iter()
            .filter(|c| c.as_str() == "list_indexes")
            .count();
        assert_eq!(listings, 3);
        assert_eq!(engine.list_indexes(0, 20).await.unwrap().total, 0);
    }
}
