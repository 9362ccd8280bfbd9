//! Filter & Connection services: per-group keyword auto-reply rules and
//! a principal's "connect to a group without leaving the current chat"
//! pointer. Both are thin SQL-backed stores over the tables the document
//! store already migrates (`filters`, `connections`).

use chrono::{DateTime, Utc};
use filedex_core::error::{Error, Result};
use filedex_core::types::{ChatId, PrincipalId};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::instrument;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Filter {
    pub id: i64,
    pub group_id: i64,
    pub text: String,
    pub reply: String,
    pub buttons: Option<serde_json::Value>,
    pub file: Option<serde_json::Value>,
    pub alert: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct FilterStore {
    pool: PgPool,
}

impl FilterStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Adds a filter, or replaces the reply/buttons/file/alert of an
    /// existing one with the same trigger text in the same group — a
    /// re-`/add` is an edit, not a duplicate.
    #[instrument(level = "debug", skip(self, reply, buttons, file))]
    pub async fn add_filter(
        &self,
        group_id: ChatId,
        text: &str,
        reply: &str,
        buttons: Option<serde_json::Value>,
        file: Option<serde_json::Value>,
        alert: Option<&str>,
    ) -> Result<Filter> {
        let row: Filter = sqlx::query_as(
            r#"
            INSERT INTO filters (group_id, text, reply, buttons, file, alert)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (group_id, text) DO UPDATE
                SET reply = EXCLUDED.reply,
                    buttons = EXCLUDED.buttons,
                    file = EXCLUDED.file,
                    alert = EXCLUDED.alert
            RETURNING *
            "#,
        )
        .bind(group_id.0)
        .bind(text.to_lowercase())
        .bind(reply)
        .bind(buttons)
        .bind(file)
        .bind(alert)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn list_filters(&self, group_id: ChatId) -> Result<Vec<Filter>> {
        let rows: Vec<Filter> =
            sqlx::query_as("SELECT * FROM filters WHERE group_id = $1 ORDER BY text ASC")
                .bind(group_id.0)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    /// Finds the filter, if any, whose trigger text appears as a
    /// substring of `message`. Case-insensitive, matching the original
    /// keyword-triggered auto-reply behavior.
    #[instrument(level = "debug", skip(self, message))]
    pub async fn find_matching(&self, group_id: ChatId, message: &str) -> Result<Option<Filter>> {
        let lowered = message.to_lowercase();
        let candidates = self.list_filters(group_id).await?;
        Ok(candidates.into_iter().find(|f| lowered.contains(&f.text)))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn delete_filter(&self, group_id: ChatId, text: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM filters WHERE group_id = $1 AND text = $2")
            .bind(group_id.0)
            .bind(text.to_lowercase())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn delete_all_filters(&self, group_id: ChatId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM filters WHERE group_id = $1")
            .bind(group_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Connection {
    pub principal_id: i64,
    pub group_ids: Vec<i64>,
    pub active_group: Option<i64>,
}

pub struct ConnectionStore {
    pool: PgPool,
}

impl ConnectionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn row(&self, principal_id: PrincipalId) -> Result<Option<Connection>> {
        let row: Option<Connection> =
            sqlx::query_as("SELECT * FROM connections WHERE principal_id = $1")
                .bind(principal_id.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    /// Connects a principal to a group, making it the active group. The
    /// group is appended to the remembered list if new.
    #[instrument(level = "debug", skip(self))]
    pub async fn connect(&self, principal_id: PrincipalId, group_id: ChatId) -> Result<Connection> {
        let row: Connection = sqlx::query_as(
            r#"
            INSERT INTO connections (principal_id, group_ids, active_group)
            VALUES ($1, ARRAY[$2]::BIGINT[], $2)
            ON CONFLICT (principal_id) DO UPDATE
                SET group_ids = CASE
                        WHEN $2 = ANY(connections.group_ids) THEN connections.group_ids
                        ELSE array_append(connections.group_ids, $2)
                    END,
                    active_group = $2,
                    updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(principal_id.0)
        .bind(group_id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn active_group(&self, principal_id: PrincipalId) -> Result<Option<ChatId>> {
        Ok(self
            .row(principal_id)
            .await?
            .and_then(|c| c.active_group)
            .map(ChatId))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn list_groups(&self, principal_id: PrincipalId) -> Result<Vec<ChatId>> {
        Ok(self
            .row(principal_id)
            .await?
            .map(|c| c.group_ids.into_iter().map(ChatId).collect())
            .unwrap_or_default())
    }

    /// Disconnects from one remembered group. Clears the active pointer
    /// if that group was active.
    #[instrument(level = "debug", skip(self))]
    pub async fn disconnect(&self, principal_id: PrincipalId, group_id: ChatId) -> Result<bool> {
        let existing = self.row(principal_id).await?;
        let Some(conn) = existing else {
            return Ok(false);
        };
        if !conn.group_ids.contains(&group_id.0) {
            return Err(Error::NotFound(format!(
                "principal {} is not connected to group {}",
                principal_id, group_id
            )));
        }

        sqlx::query(
            r#"
            UPDATE connections
            SET group_ids = array_remove(group_ids, $2),
                active_group = CASE WHEN active_group = $2 THEN NULL ELSE active_group END,
                updated_at = NOW()
            WHERE principal_id = $1
            "#,
        )
        .bind(principal_id.0)
        .bind(group_id.0)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(group_id: i64, text: &str) -> Filter {
        Filter {
            id: 1,
            group_id,
            text: text.to_string(),
            reply: "hi".to_string(),
            buttons: None,
            file: None,
            alert: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn filter_trigger_is_stored_lowercase_by_convention() {
        let f = filter(1, "hello");
        assert_eq!(f.text, f.text.to_lowercase());
    }
}
