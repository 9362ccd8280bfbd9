//! Distributed token bucket: continuous refill at `rate` tokens/sec up to
//! `capacity`, state persisted in the cache so replicas share it.

use std::sync::Arc;

use chrono::Utc;
use filedex_cache::CacheStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BucketState {
    tokens: f64,
    last_refill_ms: i64,
}

pub struct TokenBucket {
    cache: Arc<dyn CacheStore>,
    key: String,
    capacity: f64,
    rate_per_sec: f64,
}

impl TokenBucket {
    pub fn new(cache: Arc<dyn CacheStore>, key: impl Into<String>, capacity: f64, rate_per_sec: f64) -> Self {
        Self {
            cache,
            key: key.into(),
            capacity,
            rate_per_sec,
        }
    }

    /// Attempts to withdraw `n` tokens. Returns true and persists the new
    /// state on success; leaves state untouched on failure.
    pub async fn acquire(&self, n: f64) -> bool {
        let now_ms = Utc::now().timestamp_millis();

        let mut state = match self.cache.get(&self.key).await {
            Some(v) => serde_json::from_value::<BucketState>(v).unwrap_or(BucketState {
                tokens: self.capacity,
                last_refill_ms: now_ms,
            }),
            None => BucketState {
                tokens: self.capacity,
                last_refill_ms: now_ms,
            },
        };

        let elapsed_secs = ((now_ms - state.last_refill_ms).max(0) as f64) / 1000.0;
        state.tokens = (state.tokens + elapsed_secs * self.rate_per_sec).min(self.capacity);
        state.last_refill_ms = now_ms;

        if state.tokens >= n {
            state.tokens -= n;
            let value = serde_json::to_value(&state).unwrap();
            self.cache.set(&self.key, &value, Some(3600)).await;
            true
        } else {
            let value = serde_json::to_value(&state).unwrap();
            self.cache.set(&self.key, &value, Some(3600)).await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedex_cache::store::fake::InMemoryCache;

    #[tokio::test]
    async fn drains_then_refuses_until_refill() {
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
        let bucket = TokenBucket::new(cache, "bucket:test", 2.0, 1.0);

        assert!(bucket.acquire(1.0).await);
        assert!(bucket.acquire(1.0).await);
        assert!(!bucket.acquire(1.0).await);
    }
}
