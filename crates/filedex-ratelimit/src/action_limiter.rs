//! Per-`(principal, action)` sliding counters with cooldown.
//!
//! Every increment refreshes the counter's TTL to the configured window —
//! the design explicitly forbids a counter that outlives its window. A hit
//! against the limit additionally sets a cooldown key so a caller who
//! backs off immediately after being limited still finds the door shut
//! until the cooldown lapses, even if the window itself would have reset
//! sooner.

use std::collections::HashMap;
use std::sync::Arc;

use filedex_core::config::ActionLimit;
use filedex_core::types::PrincipalId;
use filedex_cache::CacheStore;

pub struct ActionLimiter {
    cache: Arc<dyn CacheStore>,
    configs: HashMap<String, ActionLimit>,
}

impl ActionLimiter {
    pub fn new(cache: Arc<dyn CacheStore>, configs: HashMap<String, ActionLimit>) -> Self {
        Self { cache, configs }
    }

    fn counter_key(principal: PrincipalId, action: &str) -> String {
        format!("ratelimit:counter:{action}:{principal}")
    }

    fn cooldown_key(principal: PrincipalId, action: &str) -> String {
        format!("ratelimit:cooldown:{action}:{principal}")
    }

    /// Returns `Ok(())` when the action is allowed, `Err(retry_after_secs)`
    /// when it is not (either the window is exhausted or a cooldown from a
    /// previous hit is still active).
    pub async fn check(&self, principal: PrincipalId, action: &str) -> Result<(), u64> {
        let Some(cfg) = self.configs.get(action) else {
            // Unconfigured actions are not rate limited.
            return Ok(());
        };

        let cooldown_key = Self::cooldown_key(principal, action);
        let cooldown_ttl = self.cache.ttl(&cooldown_key).await;
        if cooldown_ttl > 0 {
            return Err(cooldown_ttl as u64);
        }

        let counter_key = Self::counter_key(principal, action);
        let count = self.cache.incr(&counter_key, 1).await;
        // Every increment refreshes the TTL — a counter must never persist
        // without an expiry.
        self.cache.expire(&counter_key, cfg.window_secs).await;

        if count as u32 > cfg.max_requests {
            self.cache.set(&cooldown_key, &serde_json::json!(1), Some(cfg.cooldown_secs)).await;
            metrics::counter!("ratelimit.hits", 1, "action" => action.to_string());
            return Err(cfg.cooldown_secs);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedex_cache::store::fake::InMemoryCache;

    fn configs() -> HashMap<String, ActionLimit> {
        let mut m = HashMap::new();
        m.insert(
            "search".to_string(),
            ActionLimit {
                max_requests: 2,
                window_secs: 60,
                cooldown_secs: 30,
            },
        );
        m
    }

    #[tokio::test]
    async fn allows_up_to_the_configured_max_then_cools_down() {
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
        let limiter = ActionLimiter::new(cache, configs());
        let p = PrincipalId(1);

        assert!(limiter.check(p, "search").await.is_ok());
        assert!(limiter.check(p, "search").await.is_ok());
        assert!(limiter.check(p, "search").await.is_err());
    }

    #[tokio::test]
    async fn unconfigured_action_is_never_limited() {
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
        let limiter = ActionLimiter::new(cache, configs());
        let p = PrincipalId(1);
        for _ in 0..50 {
            assert!(limiter.check(p, "unlisted_action").await.is_ok());
        }
    }
}
