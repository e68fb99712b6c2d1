//! Waiting on engine tasks

use super::SyncError;
use crate::config::EngineConfig;
use crate::engine::{SearchEngine, Task, TaskInfo, TaskStatus};
use crate::shutdown::Shutdown;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Polls enqueued tasks until they finish
#[derive(Clone)]
pub struct TaskWaiter {
    engine: Arc<dyn SearchEngine>,
    timeout: Duration,
    poll_interval: Duration,
    shutdown: Shutdown,
}

impl TaskWaiter {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        let defaults = EngineConfig::default();
        Self {
            engine,
            timeout: defaults.task_timeout(),
            poll_interval: defaults.task_poll_interval(),
            shutdown: Shutdown::never(),
        }
    }

    /// Bound each wait (zero = wait indefinitely)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Abort waits when `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Wait for a task and require it to succeed
    pub async fn wait(&self, info: TaskInfo) -> Result<Task, SyncError> {
        let task_uid = info.task_uid;
        debug!("Waiting for task {} ({:?})", task_uid, info.kind);

        let task = tokio::select! {
            result = self.engine.wait_for_task(task_uid, self.timeout, self.poll_interval) => result?,
            _ = self.shutdown.cancelled() => return Err(SyncError::Cancelled { task_uid }),
        };

        if task.status == TaskStatus::Succeeded {
            Ok(task)
        } else {
            let message = task
                .error
                .as_ref()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "no error details".to_string());
            Err(SyncError::TaskFailed {
                task_uid,
                status: task.status,
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, MemoryEngine, TaskKind};

    #[tokio::test]
    async fn test_wait_succeeds() {
        let engine = Arc::new(MemoryEngine::new());
        let waiter = TaskWaiter::new(engine.clone());
        let info = engine.create_index("titles", "aid").await.unwrap();
        let task = waiter.wait(info).await.unwrap();
        assert_eq!(task.kind, TaskKind::IndexCreation);
    }

    #[tokio::test]
    async fn test_failed_task_is_an_error() {
        let engine = Arc::new(MemoryEngine::new());
        engine.fail_tasks(TaskKind::IndexCreation);
        let waiter = TaskWaiter::new(engine.clone());

        let info = engine.create_index("titles", "aid").await.unwrap();
        let err = waiter.wait(info).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::TaskFailed { status: TaskStatus::Failed, .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_an_error() {
        let engine = Arc::new(MemoryEngine::new());
        engine.stall_tasks(TaskKind::IndexCreation);
        let waiter = TaskWaiter::new(engine.clone())
            .with_timeout(Duration::from_millis(20))
            .with_poll_interval(Duration::from_millis(1));

        let info = engine.create_index("titles", "aid").await.unwrap();
        let err = waiter.wait(info).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Engine(EngineError::TaskTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_wait() {
        let engine = Arc::new(MemoryEngine::new());
        engine.stall_tasks(TaskKind::IndexCreation);
        let (trigger, shutdown) = Shutdown::channel();
        let waiter = TaskWaiter::new(engine.clone())
            .with_poll_interval(Duration::from_millis(1))
            .with_shutdown(shutdown);

        let info = engine.create_index("titles", "aid").await.unwrap();
        trigger.trigger();
        let err = waiter.wait(info).await.unwrap_err();
        assert!(matches!(err, SyncError::Cancelled { .. }));
    }
}
