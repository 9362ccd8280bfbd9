//! Live settings view backed by `BotSetting` rows, replacing the pattern
//! of mutating an in-memory config object after load. Readers take a
//! snapshot (cached briefly); writers go through `set`, which rejects the
//! protected key set before touching the store.

use std::sync::Arc;

use filedex_cache::{CacheStore, Invalidator};
use filedex_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Keys that are read-only through the runtime admin path: credentials and
/// database URIs must only ever be changed by editing the static config.
const PROTECTED_KEYS: &[&str] = &["database.url", "cache.url", "platform.bot_token"];

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BotSetting {
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub default_value: Option<String>,
    pub description: Option<String>,
}

pub struct SettingsView {
    pool: PgPool,
    cache: Arc<dyn CacheStore>,
    invalidator: Arc<Invalidator>,
}

impl SettingsView {
    pub fn new(pool: PgPool, cache: Arc<dyn CacheStore>, invalidator: Arc<Invalidator>) -> Self {
        Self {
            pool,
            cache,
            invalidator,
        }
    }

    pub fn is_protected(key: &str) -> bool {
        PROTECTED_KEYS.contains(&key)
    }

    pub async fn get(&self, key: &str) -> Result<Option<BotSetting>> {
        let cache_key = format!("setting:{key}");
        if let Some(v) = self.cache.get(&cache_key).await {
            if let Ok(setting) = serde_json::from_value(v) {
                return Ok(Some(setting));
            }
        }

        let row: Option<BotSetting> = sqlx::query_as("SELECT * FROM bot_settings WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(ref setting) = row {
            if let Ok(v) = serde_json::to_value(setting) {
                self.cache.set(&cache_key, &v, Some(300)).await;
            }
        }
        Ok(row)
    }

    /// Writes a setting, rejecting the protected key set at this boundary
    /// regardless of who the caller is — owner-only gating happens above
    /// this in the command layer, but this is the hard backstop.
    pub async fn set(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        if Self::is_protected(key) {
            return Err(Error::InsufficientPermissions(format!(
                "setting '{key}' is protected and cannot be changed at runtime"
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO bot_settings (key, value, value_type)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, value_type = EXCLUDED.value_type, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(value_type)
        .execute(&self.pool)
        .await?;

        self.invalidator.invalidate_setting(key).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_keys_are_recognized() {
        assert!(SettingsView::is_protected("database.url"));
        assert!(!SettingsView::is_protected("ingest.batch_deadline_ms"));
    }
}
