//! Index synchronization
//!
//! Keeps the remote search indexes in line with the latest dump:
//! - [`IndexSynchronizer`]: index setup, delete-then-add replacement, reset
//! - [`MetadataStore`]: the per-index import metadata record
//!
//! Every mutation is a remote task. [`TaskWaiter`] polls it to a terminal
//! status and turns anything but `succeeded` into a [`SyncError`].

pub mod metadata;
pub mod sync;
pub mod task;

pub use metadata::MetadataStore;
pub use sync::{anime_index_settings, IndexSynchronizer, INDEX_LIST_PAGE_SIZE};
pub use task::TaskWaiter;

use crate::engine::{EngineError, TaskStatus};
use thiserror::Error;

/// Errors that can occur while synchronizing indexes
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A task reached a terminal status other than `succeeded`
    #[error("Task {task_uid} finished with status {status}: {message}")]
    TaskFailed {
        task_uid: u64,
        status: TaskStatus,
        message: String,
    },

    #[error("Cancelled while waiting for task {task_uid}")]
    Cancelled { task_uid: u64 },

    #[error("Failed to encode documents: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Stored metadata is invalid: {0}")]
    InvalidMetadata(#[source] serde_json::Error),
}
