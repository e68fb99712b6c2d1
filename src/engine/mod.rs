//! Search engine boundary
//!
//! Everything michiru does against the remote search engine is expressed in
//! terms of the primitives on [`SearchEngine`]: index create/describe/delete,
//! document add/delete-all/get, settings update, search, and task lookup.
//! Mutating calls return a [`TaskInfo`]; callers poll the task to a terminal
//! status with [`SearchEngine::wait_for_task`].
//!
//! Two implementations are provided:
//! - [`MeiliClient`]: Meilisearch over its REST API
//! - [`MemoryEngine`]: an in-process engine for tests and offline runs

pub mod meili;
pub mod memory;

pub use meili::MeiliClient;
pub use memory::MemoryEngine;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Errors that can occur when talking to the search engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The engine answered with a non-success status
    #[error("Engine returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A response body could not be decoded
    #[error("Invalid engine response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A task did not reach a terminal status in time
    #[error("Task {task_uid} did not finish within {timeout:?}")]
    TaskTimeout { task_uid: u64, timeout: Duration },

    /// Client configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Whether the engine reported the requested resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Api { status: 404, .. })
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

// ============================================================================
// Tasks
// ============================================================================

/// Lifecycle status of an asynchronous engine task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Whether the task will not change status anymore
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Enqueued => "enqueued",
            TaskStatus::Processing => "processing",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Canceled => "canceled",
            TaskStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of work a task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskKind {
    IndexCreation,
    IndexDeletion,
    SettingsUpdate,
    DocumentAdditionOrUpdate,
    DocumentDeletion,
    #[serde(other)]
    Other,
}

/// Summary returned when a task is enqueued
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub task_uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub kind: TaskKind,
}

/// Failure details attached to a failed task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFailure {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Full task state as reported by the task endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub uid: u64,
    #[serde(default)]
    pub index_uid: Option<String>,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub error: Option<TaskFailure>,
}

// ============================================================================
// Indexes, settings, search
// ============================================================================

/// Description of an existing index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexInfo {
    pub uid: String,
    #[serde(default)]
    pub primary_key: Option<String>,
}

/// One page of the index listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPage {
    pub results: Vec<IndexInfo>,
    pub offset: usize,
    pub limit: usize,
    pub total: usize,
}

/// Index settings applied at creation time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displayed_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_rules: Option<Vec<String>>,
}

/// Search request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub q: String,
    pub offset: usize,
    pub limit: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes_to_highlight: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_pre_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_post_tag: Option<String>,
    #[serde(default)]
    pub show_ranking_score: bool,
}

/// Raw search response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHits {
    pub hits: Vec<serde_json::Value>,
    #[serde(default)]
    pub estimated_total_hits: usize,
}

// ============================================================================
// Engine trait
// ============================================================================

/// Protocol primitives of the remote search engine
///
/// The trait is object-safe; the process builds one client at startup and
/// shares it as `Arc<dyn SearchEngine>`.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Describe an index, `None` if it does not exist
    async fn get_index(&self, uid: &str) -> EngineResult<Option<IndexInfo>>;

    /// List indexes, one page at a time
    async fn list_indexes(&self, offset: usize, limit: usize) -> EngineResult<IndexPage>;

    async fn create_index(&self, uid: &str, primary_key: &str) -> EngineResult<TaskInfo>;

    async fn delete_index(&self, uid: &str) -> EngineResult<TaskInfo>;

    async fn update_settings(&self, uid: &str, settings: &IndexSettings)
        -> EngineResult<TaskInfo>;

    /// Add or replace documents, matched on the index primary key
    async fn add_documents(
        &self,
        uid: &str,
        documents: Vec<serde_json::Value>,
    ) -> EngineResult<TaskInfo>;

    async fn delete_all_documents(&self, uid: &str) -> EngineResult<TaskInfo>;

    /// Fetch one document by primary key, `None` if missing
    async fn get_document(
        &self,
        uid: &str,
        document_id: &str,
    ) -> EngineResult<Option<serde_json::Value>>;

    async fn search(&self, uid: &str, query: &SearchQuery) -> EngineResult<SearchHits>;

    async fn get_task(&self, task_uid: u64) -> EngineResult<Task>;

    /// Poll a task until it reaches a terminal status
    ///
    /// A zero `timeout` waits indefinitely. The returned task may have failed;
    /// interpreting the status is up to the caller.
    async fn wait_for_task(
        &self,
        task_uid: u64,
        timeout: Duration,
        poll_interval: Duration,
    ) -> EngineResult<Task> {
        let poll = async {
            loop {
                let task = self.get_task(task_uid).await?;
                if task.status.is_terminal() {
                    return Ok(task);
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        if timeout.is_zero() {
            poll.await
        } else {
            tokio::time::timeout(timeout, poll)
                .await
                .map_err(|_| EngineError::TaskTimeout { task_uid, timeout })?
        }
    }
}
