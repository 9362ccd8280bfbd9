//! ResultSession: a cache-only record holding a materialized page of
//! results so follow-up actions (pagination, bulk send) don't re-query.

use std::sync::Arc;

use filedex_cache::CacheStore;
use filedex_core::types::PrincipalId;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSession {
    pub session_id: String,
    pub principal_id: i64,
    pub query: String,
    pub file_unique_ids: Vec<String>,
}

pub struct SessionStore {
    cache: Arc<dyn CacheStore>,
    ttl_secs: u64,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn CacheStore>, ttl_secs: u64) -> Self {
        Self { cache, ttl_secs }
    }

    fn key(principal_id: PrincipalId, session_id: &str) -> String {
        format!("result_session:{principal_id}:{session_id}")
    }

    pub async fn create(
        &self,
        principal_id: PrincipalId,
        query: &str,
        file_unique_ids: Vec<String>,
    ) -> ResultSession {
        let session_id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();

        let session = ResultSession {
            session_id: session_id.clone(),
            principal_id: principal_id.0,
            query: query.to_string(),
            file_unique_ids,
        };

        let key = Self::key(principal_id, &session_id);
        if let Ok(v) = serde_json::to_value(&session) {
            self.cache.set(&key, &v, Some(self.ttl_secs)).await;
        }
        session
    }

    pub async fn load(&self, principal_id: PrincipalId, session_id: &str) -> Option<ResultSession> {
        let key = Self::key(principal_id, session_id);
        self.cache.get(&key).await.and_then(|v| serde_json::from_value(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedex_cache::store::fake::InMemoryCache;

    #[tokio::test]
    async fn session_ids_are_eight_chars_and_round_trip() {
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
        let store = SessionStore::new(cache, 3600);
        let p = PrincipalId(42);

        let session = store.create(p, "avatar", vec!["a".into(), "b".into()]).await;
        assert_eq!(session.session_id.len(), 8);

        let loaded = store.load(p, &session.session_id).await.unwrap();
        assert_eq!(loaded.file_unique_ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn missing_session_is_absent() {
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new());
        let store = SessionStore::new(cache, 3600);
        assert!(store.load(PrincipalId(1), "nosuch00").await.is_none());
    }
}
