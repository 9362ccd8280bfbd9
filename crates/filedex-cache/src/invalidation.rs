//! Targeted invalidators. Bulk search invalidation is O(1): it bumps an
//! integer version key that every search-page key is namespaced under,
//! instead of pattern-deleting every cached page. The bump itself is
//! throttled to once per 5 seconds so a burst of deletes doesn't stampede
//! the cache with version churn.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::store::CacheStore;

const SEARCH_VERSION_KEY: &str = "search:version";
const SEARCH_VERSION_THROTTLE: Duration = Duration::from_secs(5);

pub struct Invalidator {
    cache: Arc<dyn CacheStore>,
    last_version_bump: Mutex<Option<Instant>>,
}

impl Invalidator {
    pub fn new(cache: Arc<dyn CacheStore>) -> Self {
        Self {
            cache,
            last_version_bump: Mutex::new(None),
        }
    }

    pub async fn invalidate_principal(&self, principal_id: i64) {
        self.cache.delete(&format!("principal:{principal_id}")).await;
    }

    pub async fn invalidate_banned_list(&self) {
        self.cache.delete("principals:banned").await;
    }

    pub async fn invalidate_file(&self, file_unique_id: &str, file_id: &str, file_ref: Option<&str>) {
        self.cache.delete(&format!("file:uid:{file_unique_id}")).await;
        self.cache.delete(&format!("file:id:{file_id}")).await;
        if let Some(r) = file_ref {
            self.cache.delete(&format!("file:ref:{r}")).await;
        }
    }

    pub async fn invalidate_file_stats(&self) {
        self.cache.delete("files:stats").await;
    }

    pub async fn invalidate_setting(&self, key: &str) {
        self.cache.delete(&format!("setting:{key}")).await;
    }

    /// Bumps the search-results version, throttled to at most once per 5s.
    /// Callers that invalidate many files in a loop (bulk delete) only pay
    /// for one bump regardless of how many call this within the window.
    pub async fn invalidate_search_results(&self) {
        let should_bump = {
            let mut last = self.last_version_bump.lock().unwrap();
            let now = Instant::now();
            let due = last.map(|t| now.duration_since(t) >= SEARCH_VERSION_THROTTLE).unwrap_or(true);
            if due {
                *last = Some(now);
            }
            due
        };
        if should_bump {
            self.cache.incr(SEARCH_VERSION_KEY, 1).await;
        }
    }

    pub async fn search_version(&self) -> i64 {
        self.cache
            .get(SEARCH_VERSION_KEY)
            .await
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fake::InMemoryCache;

    #[tokio::test]
    async fn repeated_invalidation_within_window_bumps_once() {
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
        let inval = Invalidator::new(cache.clone());

        for _ in 0..10 {
            inval.invalidate_search_results().await;
        }

        assert_eq!(inval.search_version().await, 1);
    }
}
