//! Typed key/value cache over Redis. Every method swallows transport
//! errors: callers see `absent`/`false`/`0`, never a propagated error, so a
//! flaky cache degrades the caller to a document-store read instead of
//! failing the request.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::{debug, warn};

use crate::codec;

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: &Value, ttl_secs: Option<u64>);
    async fn delete(&self, key: &str);
    /// Enumerates matching keys in chunks of at most 100 and deletes each
    /// chunk; a failed chunk is counted but does not abort the scan.
    async fn delete_pattern(&self, glob: &str) -> u64;
    async fn mget(&self, keys: &[String]) -> Vec<Option<Value>>;
    async fn incr(&self, key: &str, n: i64) -> i64;
    async fn expire(&self, key: &str, ttl_secs: u64) -> bool;
    async fn ttl(&self, key: &str) -> i64;
}

#[derive(Clone)]
pub struct RedisCache {
    manager: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> filedex_core::error::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut conn = self.manager.clone();
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(Some(bytes)) => codec::decode(&bytes),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, key, "cache get failed, treating as absent");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl_secs: Option<u64>) {
        let mut conn = self.manager.clone();
        let bytes = codec::encode(value);
        let result = match ttl_secs {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, bytes, ttl).await,
            None => conn.set::<_, _, ()>(key, bytes).await,
        };
        if let Err(e) = result {
            warn!(error = %e, key, "cache set failed");
        }
    }

    async fn delete(&self, key: &str) {
        let mut conn = self.manager.clone();
        if let Err(e) = conn.del::<_, ()>(key).await {
            warn!(error = %e, key, "cache delete failed");
        }
    }

    async fn delete_pattern(&self, glob: &str) -> u64 {
        let mut conn = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;
        loop {
            let scan: redis::RedisResult<(u64, Vec<String>)> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(glob)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await;

            let (next_cursor, keys) = match scan {
                Ok(v) => v,
                Err(e) => {
                    warn!(error = %e, glob, "cache scan failed mid-pattern-delete");
                    break;
                }
            };

            for chunk in keys.chunks(100) {
                match conn.del::<_, u64>(chunk).await {
                    Ok(n) => deleted += n,
                    Err(e) => warn!(error = %e, "cache chunk delete failed, continuing scan"),
                }
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        debug!(glob, deleted, "pattern delete complete");
        deleted
    }

    async fn mget(&self, keys: &[String]) -> Vec<Option<Value>> {
        if keys.is_empty() {
            return Vec::new();
        }
        let mut conn = self.manager.clone();
        match conn.get::<_, Vec<Option<Vec<u8>>>>(keys).await {
            Ok(values) => values
                .into_iter()
                .map(|v| v.and_then(|b| codec::decode(&b)))
                .collect(),
            Err(e) => {
                warn!(error = %e, "cache mget failed");
                vec![None; keys.len()]
            }
        }
    }

    async fn incr(&self, key: &str, n: i64) -> i64 {
        let mut conn = self.manager.clone();
        match conn.incr::<_, _, i64>(key, n).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, key, "cache incr failed");
                0
            }
        }
    }

    async fn expire(&self, key: &str, ttl_secs: u64) -> bool {
        let mut conn = self.manager.clone();
        conn.expire::<_, bool>(key, ttl_secs as i64).await.unwrap_or(false)
    }

    async fn ttl(&self, key: &str) -> i64 {
        let mut conn = self.manager.clone();
        conn.ttl::<_, i64>(key).await.unwrap_or(-1)
    }
}

/// In-memory fake used by unit tests and by components that must keep
/// working when Redis is unreachable at startup.
pub mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    struct Entry {
        bytes: Vec<u8>,
        expires_at: Option<Instant>,
    }

    #[derive(Default)]
    pub struct InMemoryCache {
        data: Mutex<HashMap<String, Entry>>,
    }

    impl InMemoryCache {
        pub fn new() -> Self {
            Self::default()
        }

        fn is_live(entry: &Entry) -> bool {
            entry.expires_at.map(|t| t > Instant::now()).unwrap_or(true)
        }
    }

    #[async_trait]
    impl CacheStore for InMemoryCache {
        async fn get(&self, key: &str) -> Option<Value> {
            let data = self.data.lock().unwrap();
            data.get(key)
                .filter(|e| Self::is_live(e))
                .and_then(|e| codec::decode(&e.bytes))
        }

        async fn set(&self, key: &str, value: &Value, ttl_secs: Option<u64>) {
            let mut data = self.data.lock().unwrap();
            data.insert(
                key.to_string(),
                Entry {
                    bytes: codec::encode(value),
                    expires_at: ttl_secs.map(|s| Instant::now() + Duration::from_secs(s)),
                },
            );
        }

        async fn delete(&self, key: &str) {
            self.data.lock().unwrap().remove(key);
        }

        async fn delete_pattern(&self, glob: &str) -> u64 {
            let prefix = glob.trim_end_matches('*');
            let mut data = self.data.lock().unwrap();
            let matches: Vec<String> = data
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect();
            for k in &matches {
                data.remove(k);
            }
            matches.len() as u64
        }

        async fn mget(&self, keys: &[String]) -> Vec<Option<Value>> {
            let data = self.data.lock().unwrap();
            keys.iter()
                .map(|k| {
                    data.get(k)
                        .filter(|e| Self::is_live(e))
                        .and_then(|e| codec::decode(&e.bytes))
                })
                .collect()
        }

        async fn incr(&self, key: &str, n: i64) -> i64 {
            let mut data = self.data.lock().unwrap();
            let current = data
                .get(key)
                .filter(|e| Self::is_live(e))
                .and_then(|e| codec::decode(&e.bytes))
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            let new_value = current + n;
            let expires_at = data.get(key).and_then(|e| e.expires_at);
            data.insert(
                key.to_string(),
                Entry {
                    bytes: codec::encode(&Value::from(new_value)),
                    expires_at,
                },
            );
            new_value
        }

        async fn expire(&self, key: &str, ttl_secs: u64) -> bool {
            let mut data = self.data.lock().unwrap();
            if let Some(entry) = data.get_mut(key) {
                entry.expires_at = Some(Instant::now() + Duration::from_secs(ttl_secs));
                true
            } else {
                false
            }
        }

        async fn ttl(&self, key: &str) -> i64 {
            let data = self.data.lock().unwrap();
            match data.get(key).and_then(|e| e.expires_at) {
                Some(t) => (t - Instant::now()).as_secs() as i64,
                None => -1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::InMemoryCache;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = InMemoryCache::new();
        cache.set("k", &json!({"a": 1}), None).await;
        assert_eq!(cache.get("k").await, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn incr_must_be_paired_with_a_ttl_by_callers() {
        let cache = InMemoryCache::new();
        let v1 = cache.incr("counter", 1).await;
        assert!(cache.expire("counter", 60).await);
        let v2 = cache.incr("counter", 1).await;
        assert_eq!((v1, v2), (1, 2));
        assert!(cache.ttl("counter").await > 0);
    }

    #[tokio::test]
    async fn missing_key_is_absent_not_an_error() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("nope").await, None);
        assert_eq!(cache.ttl("nope").await, -1);
    }
}
