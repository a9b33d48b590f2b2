mod local;

pub use local::LocalTaskRunner;

use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::error::{ExecutionError, ExecutionResult};
use crate::id::TaskId;

/// A pending task result, keyed by the position of the task within its
/// submission batch.
pub struct TaskHandle<T> {
    task_id: TaskId,
    key: usize,
    receiver: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(task_id: TaskId, key: usize, receiver: oneshot::Receiver<T>) -> Self {
        Self {
            task_id,
            key,
            receiver,
        }
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn key(&self) -> usize {
        self.key
    }
}

/// The task execution substrate.
///
/// Submission never blocks. Submitted tasks are independent and share no
/// mutable state; the only synchronization point is [`materialize`].
pub trait TaskRunner: Send + Sync + 'static {
    fn submit<T>(&self, key: usize, task: BoxFuture<'static, T>) -> TaskHandle<T>
    where
        T: Send + 'static;
}

/// Resolve a batch of handles into their values.
///
/// Handles are sorted by key before resolution, so the output order follows
/// the submission keys even when the underlying tasks complete in a
/// different order.
pub async fn materialize<T>(handles: Vec<TaskHandle<T>>) -> ExecutionResult<Vec<T>> {
    let mut handles = handles;
    handles.sort_by_key(|handle| handle.key);
    let mut values = Vec::with_capacity(handles.len());
    for TaskHandle {
        task_id, receiver, ..
    } in handles
    {
        let value = receiver
            .await
            .map_err(|_| ExecutionError::TaskAborted(format!("task {task_id} dropped its result")))?;
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::FutureExt;

    use super::*;

    #[tokio::test]
    async fn test_materialize_follows_submission_keys() {
        let runner = LocalTaskRunner::new();
        // The slowest task has the smallest key.
        let handles = vec![
            runner.submit(
                2,
                async {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    "c"
                }
                .boxed(),
            ),
            runner.submit(
                0,
                async {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    "a"
                }
                .boxed(),
            ),
            runner.submit(1, async { "b" }.boxed()),
        ];
        let values = materialize(handles).await.unwrap();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_materialize_reports_aborted_task() {
        let (tx, rx) = oneshot::channel::<u32>();
        let handle = TaskHandle::new(TaskId::from(7), 0, rx);
        drop(tx);
        let result = materialize(vec![handle]).await;
        assert!(matches!(result, Err(ExecutionError::TaskAborted(_))));
    }

    #[tokio::test]
    async fn test_task_ids_are_unique() {
        let runner = LocalTaskRunner::new();
        let first = runner.submit(0, async {}.boxed());
        let second = runner.submit(1, async {}.boxed());
        assert_ne!(first.task_id(), second.task_id());
    }
}
