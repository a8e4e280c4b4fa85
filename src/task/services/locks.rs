//! Per-task serialisation of lifecycle operations.

use crate::task::domain::TaskId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Async mutex per task; entries are dropped once no caller holds them.
#[derive(Debug, Clone, Default)]
pub(super) struct TaskLocks {
    entries: Arc<Mutex<HashMap<TaskId, Arc<AsyncMutex<()>>>>>,
}

impl TaskLocks {
    pub(super) async fn acquire(&self, task_id: TaskId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.retain(|id, entry| *id == task_id || Arc::strong_count(entry) > 1);
            Arc::clone(entries.entry(task_id).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::TaskLocks;
    use crate::task::domain::TaskId;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn second_holder_waits_for_the_first() {
        let locks = TaskLocks::default();
        let task_id = TaskId::new();
        let guard = locks.acquire(task_id).await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move { contender.acquire(task_id).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        let second = tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .expect("second holder should acquire after release")
            .expect("task should not panic");
        drop(second);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn different_tasks_do_not_block_each_other() {
        let locks = TaskLocks::default();
        let _first = locks.acquire(TaskId::new()).await;

        let second =
            tokio::time::timeout(Duration::from_secs(1), locks.acquire(TaskId::new())).await;

        assert!(second.is_ok());
    }
}
