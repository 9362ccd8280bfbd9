//! Batch link persistence: `link`/`plink`/`batch`/`pbatch` commands create
//! a `BatchLink` row identifying a message range to re-serve later.
//! Identical `(source, range, protected, premium_only, creator)` tuples
//! dedup onto the same row instead of growing unboundedly.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use filedex_core::error::Result;
use filedex_core::types::PrincipalId;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BatchLink {
    pub id: String,
    pub source_chat_id: i64,
    pub from_msg_id: i64,
    pub to_msg_id: i64,
    pub protected: bool,
    pub premium_only: bool,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct BatchLinkStore {
    pool: PgPool,
}

impl BatchLinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a batch link, or returns the existing row if an identical
    /// tuple was already created. The id is a fresh v7 uuid on first
    /// creation; dedup is enforced by the unique index on the tuple, not
    /// by a pre-check, so concurrent creators race safely.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_or_reuse(
        &self,
        source_chat_id: i64,
        from_msg_id: i64,
        to_msg_id: i64,
        protected: bool,
        premium_only: bool,
        created_by: PrincipalId,
        ttl: Option<chrono::Duration>,
    ) -> Result<BatchLink> {
        let id = Uuid::now_v7().simple().to_string();
        let expires_at = ttl.map(|d| Utc::now() + d);

        let inserted: Option<BatchLink> = sqlx::query_as(
            r#"
            INSERT INTO batch_links
                (id, source_chat_id, from_msg_id, to_msg_id, protected, premium_only, created_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_chat_id, from_msg_id, to_msg_id, protected, premium_only, created_by)
            DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(source_chat_id)
        .bind(from_msg_id)
        .bind(to_msg_id)
        .bind(protected)
        .bind(premium_only)
        .bind(created_by.0)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(link) = inserted {
            return Ok(link);
        }

        let existing: BatchLink = sqlx::query_as(
            r#"
            SELECT * FROM batch_links
            WHERE source_chat_id = $1 AND from_msg_id = $2 AND to_msg_id = $3
              AND protected = $4 AND premium_only = $5 AND created_by = $6
            "#,
        )
        .bind(source_chat_id)
        .bind(from_msg_id)
        .bind(to_msg_id)
        .bind(protected)
        .bind(premium_only)
        .bind(created_by.0)
        .fetch_one(&self.pool)
        .await?;

        Ok(existing)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn find(&self, id: &str) -> Result<Option<BatchLink>> {
        Ok(
            sqlx::query_as("SELECT * FROM batch_links WHERE id = $1 AND (expires_at IS NULL OR expires_at > NOW())")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn delete_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM batch_links WHERE expires_at IS NOT NULL AND expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
