use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use log::debug;
use tokio::sync::oneshot;

use crate::id::TaskId;
use crate::runner::{TaskHandle, TaskRunner};

/// Runs submitted tasks on the ambient tokio runtime.
pub struct LocalTaskRunner {
    next_task_id: AtomicU64,
}

impl LocalTaskRunner {
    pub fn new() -> Self {
        Self {
            next_task_id: AtomicU64::new(1),
        }
    }
}

impl Default for LocalTaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner for LocalTaskRunner {
    fn submit<T>(&self, key: usize, task: BoxFuture<'static, T>) -> TaskHandle<T>
    where
        T: Send + 'static,
    {
        let task_id = TaskId::from(self.next_task_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            // The receiver is gone if the caller bailed out early.
            let _ = tx.send(task.await);
        });
        debug!("submitted task {task_id} with key {key}");
        TaskHandle::new(task_id, key, rx)
    }
}
