use crate::runtime::handle::TaskHandle;
use crate::runtime::task::Task;
use tokio::sync::oneshot;
use uuid::Uuid;

pub trait Scheduler: Send + Sync {
    fn submit<T>(&self, task: T) -> TaskHandle<T::Output>
    where
        T: Task + 'static;
}

/// Runs each task on tokio's blocking pool.
///
/// Must be called from inside a tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalScheduler {}

impl LocalScheduler {
    pub fn new() -> Self {
        Self {}
    }
}

impl Scheduler for LocalScheduler {
    fn submit<T>(&self, task: T) -> TaskHandle<T::Output>
    where
        T: Task + 'static,
    {
        let task_id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();

        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || task.call())
                .await
                .map_err(Into::into);
            if sender.send(result).is_err() {
                tracing::debug!(%task_id, "task handle dropped before completion");
            }
        });

        TaskHandle::new(task_id, receiver)
    }
}
