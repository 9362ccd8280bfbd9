//! A named set of per-process semaphores capping concurrent outbound
//! operations (`database_write`, `platform_send`, ...). Registered once at
//! process start and shared through the bot's `Context`, replacing the
//! "global semaphore manager singleton" pattern with an explicit owned
//! component.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Semaphore, SemaphorePermit};

pub struct SemaphoreSet {
    semaphores: HashMap<String, Arc<Semaphore>>,
}

impl SemaphoreSet {
    pub fn new(permits: impl IntoIterator<Item = (String, usize)>) -> Self {
        Self {
            semaphores: permits
                .into_iter()
                .map(|(name, n)| (name, Arc::new(Semaphore::new(n))))
                .collect(),
        }
    }

    pub async fn acquire(&self, name: &str) -> Option<SemaphorePermit<'_>> {
        let sem = self.semaphores.get(name)?;
        sem.acquire().await.ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn caps_concurrency_at_configured_permits() {
        let set = SemaphoreSet::new([("platform_send".to_string(), 1)]);
        let _first = set.acquire("platform_send").await.unwrap();
        assert!(set.semaphores["platform_send"].available_permits() == 0);
    }

    #[tokio::test]
    async fn unknown_name_returns_none() {
        let set = SemaphoreSet::new([("database_write".to_string(), 2)]);
        assert!(set.acquire("not_registered").await.is_none());
    }
}
