//! The watched-channel set: which channels Mode A (live watch) pulls
//! media from, and the running per-channel indexed count the admin
//! surface reports.

use chrono::{DateTime, Utc};
use filedex_core::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IndexedChannel {
    pub channel_id: i64,
    pub username: Option<String>,
    pub title: Option<String>,
    pub enabled: bool,
    pub indexed_count: i64,
    pub last_indexed_at: Option<DateTime<Utc>>,
    pub added_by: Option<i64>,
    pub created_at: DateTime<Utc>,
}

pub struct ChannelStore {
    pool: PgPool,
}

impl ChannelStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn add_channel(
        &self,
        channel_id: i64,
        username: Option<&str>,
        title: Option<&str>,
        added_by: i64,
    ) -> Result<IndexedChannel> {
        let row: IndexedChannel = sqlx::query_as(
            r#"
            INSERT INTO indexed_channels (channel_id, username, title, added_by)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (channel_id) DO UPDATE
                SET username = EXCLUDED.username, title = EXCLUDED.title, enabled = TRUE
            RETURNING *
            "#,
        )
        .bind(channel_id)
        .bind(username)
        .bind(title)
        .bind(added_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn remove_channel(&self, channel_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM indexed_channels WHERE channel_id = $1")
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn list_channels(&self) -> Result<Vec<IndexedChannel>> {
        let rows: Vec<IndexedChannel> =
            sqlx::query_as("SELECT * FROM indexed_channels ORDER BY created_at ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn list_enabled(&self) -> Result<Vec<IndexedChannel>> {
        let rows: Vec<IndexedChannel> =
            sqlx::query_as("SELECT * FROM indexed_channels WHERE enabled = TRUE")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    /// Whether `channel_id` is a registered, enabled live-watch target.
    #[instrument(level = "debug", skip(self))]
    pub async fn is_watched(&self, channel_id: i64) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT channel_id FROM indexed_channels WHERE channel_id = $1 AND enabled = TRUE",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Flips `enabled`, returning the new value.
    #[instrument(level = "debug", skip(self))]
    pub async fn toggle(&self, channel_id: i64) -> Result<bool> {
        let (enabled,): (bool,) = sqlx::query_as(
            "UPDATE indexed_channels SET enabled = NOT enabled WHERE channel_id = $1 RETURNING enabled",
        )
        .bind(channel_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(enabled)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn record_indexed(&self, channel_id: i64, delta: i64) -> Result<()> {
        sqlx::query(
            "UPDATE indexed_channels SET indexed_count = indexed_count + $2, last_indexed_at = NOW() WHERE channel_id = $1",
        )
        .bind(channel_id)
        .bind(delta)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
