//! Explicit auto-delete task bookkeeping: a registry keyed by task id with
//! add-on-schedule, remove-on-complete, and cancel-all-on-shutdown. This
//! replaces a weak-reference task set with an owned, inspectable registry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

pub struct TaskRegistry {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Spawns `fut` under a fresh id and wraps it so the registry forgets
    /// the id itself once the future completes on its own; `cancel_all`
    /// is the only path left that removes an entry for a task still
    /// running.
    pub fn spawn_tracked<F>(self: &Arc<Self>, fut: F) -> u64
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = self.clone();
        let handle = tokio::spawn(async move {
            fut.await;
            registry.remove(id);
        });
        self.tasks.lock().unwrap().insert(id, handle);
        id
    }

    /// Schedules an already-spawned `handle` under a fresh id without any
    /// self-removal; the caller is responsible for calling `remove` once
    /// it knows the task is done. Prefer `spawn_tracked` for new callers.
    pub fn track(&self, handle: JoinHandle<()>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tasks.lock().unwrap().insert(id, handle);
        id
    }

    pub fn remove(&self, id: u64) {
        self.tasks.lock().unwrap().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cancels every outstanding task. Called on process shutdown so
    /// auto-delete tasks don't leak past the service's own lifetime.
    pub fn cancel_all(&self) {
        let mut tasks = self.tasks.lock().unwrap();
        for (_, handle) in tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_all_aborts_outstanding_tasks() {
        let registry = TaskRegistry::new();
        let handle = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        let id = registry.track(handle);
        assert_eq!(registry.len(), 1);

        registry.cancel_all();
        assert_eq!(registry.len(), 0);
        let _ = id;
    }

    #[tokio::test]
    async fn completed_tasks_are_removed_explicitly() {
        let registry = TaskRegistry::new();
        let handle = tokio::spawn(async {});
        let id = registry.track(handle);
        tokio::time::sleep(Duration::from_millis(10)).await;
        registry.remove(id);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn spawn_tracked_removes_itself_on_completion() {
        let registry = Arc::new(TaskRegistry::new());
        let _id = registry.spawn_tracked(async {});
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(registry.is_empty(), "a finished task should no longer occupy the registry");
    }
}
