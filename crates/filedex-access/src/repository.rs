//! Principal repository: ban/premium writes, the `can_retrieve` policy
//! check, and atomic quota reservation/release.

use std::sync::Arc;

use chrono::Utc;
use filedex_cache::{CacheStore, Invalidator};
use filedex_core::config::PlatformConfig;
use filedex_core::error::Result;
use filedex_core::types::PrincipalId;
use sqlx::PgPool;
use tracing::instrument;

use crate::model::{AccessDecision, AccessReason, Principal};

pub struct AccessRepository {
    pool: PgPool,
    cache: Arc<dyn CacheStore>,
    invalidator: Arc<Invalidator>,
}

impl AccessRepository {
    pub fn new(pool: PgPool, cache: Arc<dyn CacheStore>, invalidator: Arc<Invalidator>) -> Self {
        Self {
            pool,
            cache,
            invalidator,
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_or_create(&self, principal_id: PrincipalId, name: &str) -> Result<Principal> {
        let existing: Option<Principal> =
            sqlx::query_as("SELECT * FROM principals WHERE id = $1")
                .bind(principal_id.0)
                .fetch_optional(&self.pool)
                .await?;

        if let Some(p) = existing {
            return Ok(p);
        }

        let created: Principal = sqlx::query_as(
            r#"
            INSERT INTO principals (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            RETURNING *
            "#,
        )
        .bind(principal_id.0)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// `can_retrieve(principal_id, owner_id?)` — the full policy ladder
    /// from the access design: global premium toggle, ownership, ban,
    /// premium-active, stale-date zeroing, and daily-limit comparison, in
    /// that order.
    #[instrument(level = "debug", skip(self, config))]
    pub async fn can_retrieve(
        &self,
        principal_id: PrincipalId,
        owner_id: Option<PrincipalId>,
        config: &PlatformConfig,
        is_admin: bool,
    ) -> Result<AccessDecision> {
        if config.premium_disabled {
            return Ok(AccessDecision {
                allowed: true,
                reason: AccessReason::Unlimited,
            });
        }
        if Some(principal_id) == owner_id {
            return Ok(AccessDecision {
                allowed: true,
                reason: AccessReason::Owner,
            });
        }
        if is_admin {
            return Ok(AccessDecision {
                allowed: true,
                reason: AccessReason::Admin,
            });
        }

        let principal: Option<Principal> =
            sqlx::query_as("SELECT * FROM principals WHERE id = $1")
                .bind(principal_id.0)
                .fetch_optional(&self.pool)
                .await?;

        let principal = match principal {
            Some(p) => p,
            None => {
                return Ok(AccessDecision {
                    allowed: true,
                    reason: AccessReason::Allowed {
                        remaining: config.daily_limit,
                    },
                })
            }
        };

        if principal.status() == filedex_core::types::PrincipalStatus::Banned {
            return Ok(AccessDecision {
                allowed: false,
                reason: AccessReason::Banned(
                    principal.ban_reason.unwrap_or_else(|| "banned".to_string()),
                ),
            });
        }

        let now = Utc::now();
        if principal.premium_active(config.premium_duration_days, now) {
            let remaining_days = (principal.premium_activation_date.unwrap()
                + chrono::Duration::days(config.premium_duration_days)
                - now)
                .num_days();
            return Ok(AccessDecision {
                allowed: true,
                reason: AccessReason::PremiumActive { remaining_days },
            });
        }
        // Premium flagged but expired: the caller should clear the flag on
        // the next write path (ban/unban/premium writes below); the read
        // path here just falls through to the quota check.

        let today = now.date_naive();
        let effective_count = principal.effective_daily_count(today);

        if effective_count >= config.daily_limit {
            return Ok(AccessDecision {
                allowed: false,
                reason: AccessReason::DailyLimitReached,
            });
        }

        Ok(AccessDecision {
            allowed: true,
            reason: AccessReason::Allowed {
                remaining: config.daily_limit - effective_count,
            },
        })
    }

    /// Atomically reserves up to `n` units of daily quota, rolling the
    /// counter over to today first if it was stale. A single
    /// `UPDATE ... FROM (SELECT ... FOR UPDATE) ... RETURNING` statement —
    /// concurrent callers serialize on the row lock, so this is never a
    /// read-then-write race.
    #[instrument(level = "debug", skip(self))]
    pub async fn reserve_quota_atomic(
        &self,
        principal_id: PrincipalId,
        n: i64,
        daily_limit: i64,
    ) -> Result<(bool, i64, String)> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            WITH prev AS (
                SELECT daily_retrieval_count, last_retrieval_date
                FROM principals WHERE id = $1 FOR UPDATE
            )
            UPDATE principals p
            SET daily_retrieval_count = LEAST(
                    (CASE WHEN prev.last_retrieval_date = CURRENT_DATE
                          THEN prev.daily_retrieval_count ELSE 0 END) + $2,
                    $3
                ),
                last_retrieval_date = CURRENT_DATE,
                updated_at = NOW()
            FROM prev
            WHERE p.id = $1
            RETURNING p.daily_retrieval_count,
                      (CASE WHEN prev.last_retrieval_date = CURRENT_DATE
                            THEN prev.daily_retrieval_count ELSE 0 END)
            "#,
        )
        .bind(principal_id.0)
        .bind(n)
        .bind(daily_limit)
        .fetch_one(&self.pool)
        .await?;

        let (new_count, old_count) = row;
        let reserved = new_count - old_count;

        self.invalidator.invalidate_principal(principal_id.0).await;

        if reserved <= 0 {
            Ok((false, 0, "daily limit reached".to_string()))
        } else {
            Ok((true, reserved, "reserved".to_string()))
        }
    }

    /// Refunds `n` units of previously reserved quota, clamped at 0.
    #[instrument(level = "debug", skip(self))]
    pub async fn release_quota(&self, principal_id: PrincipalId, n: i64) -> Result<i64> {
        if n <= 0 {
            return Ok(0);
        }
        let (new_count,): (i64,) = sqlx::query_as(
            r#"
            UPDATE principals
            SET daily_retrieval_count = GREATEST(daily_retrieval_count - $2, 0),
                updated_at = NOW()
            WHERE id = $1
            RETURNING daily_retrieval_count
            "#,
        )
        .bind(principal_id.0)
        .bind(n)
        .fetch_one(&self.pool)
        .await?;

        self.invalidator.invalidate_principal(principal_id.0).await;
        Ok(new_count)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn ban(&self, principal_id: PrincipalId, reason: &str) -> Result<()> {
        sqlx::query(
            "UPDATE principals SET status = 'banned', ban_reason = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(principal_id.0)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        self.invalidator.invalidate_principal(principal_id.0).await;
        self.invalidator.invalidate_banned_list().await;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn unban(&self, principal_id: PrincipalId) -> Result<()> {
        sqlx::query(
            "UPDATE principals SET status = 'active', ban_reason = NULL, updated_at = NOW() WHERE id = $1",
        )
        .bind(principal_id.0)
        .execute(&self.pool)
        .await?;

        self.invalidator.invalidate_principal(principal_id.0).await;
        self.invalidator.invalidate_banned_list().await;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_banned(&self) -> Result<Vec<Principal>> {
        if let Some(cached) = self.cache.get("principals:banned").await {
            if let Ok(list) = serde_json::from_value(cached) {
                return Ok(list);
            }
        }
        let banned: Vec<Principal> =
            sqlx::query_as("SELECT * FROM principals WHERE status = 'banned'")
                .fetch_all(&self.pool)
                .await?;
        if let Ok(v) = serde_json::to_value(&banned) {
            self.cache.set("principals:banned", &v, Some(600)).await;
        }
        Ok(banned)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn set_premium(&self, principal_id: PrincipalId, enabled: bool) -> Result<()> {
        if enabled {
            sqlx::query(
                "UPDATE principals SET is_premium = TRUE, premium_activation_date = NOW(), updated_at = NOW() WHERE id = $1",
            )
            .bind(principal_id.0)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query(
                "UPDATE principals SET is_premium = FALSE, premium_activation_date = NULL, updated_at = NOW() WHERE id = $1",
            )
            .bind(principal_id.0)
            .execute(&self.pool)
            .await?;
        }
        self.invalidator.invalidate_principal(principal_id.0).await;
        Ok(())
    }

    /// Bulk-expires premium for every principal whose activation window
    /// has lapsed. Used by the maintenance loop.
    #[instrument(level = "debug", skip(self))]
    pub async fn expire_stale_premium(&self, premium_duration_days: i64) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE principals
            SET is_premium = FALSE, updated_at = NOW()
            WHERE is_premium = TRUE
              AND premium_activation_date + ($1 || ' days')::interval < NOW()
            "#,
        )
        .bind(premium_duration_days)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Resets every principal's daily counter to 0. Callers (the
    /// maintenance loop) are responsible for the idempotency guard around
    /// this — see `filedex-maintenance`.
    #[instrument(level = "debug", skip(self))]
    pub async fn reset_all_daily_counters(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE principals SET daily_retrieval_count = 0")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// One page of non-banned principals ordered by id, for the broadcast
    /// engine's paged fan-out.
    #[instrument(level = "debug", skip(self))]
    pub async fn list_broadcastable_page(&self, after_id: i64, limit: i64) -> Result<Vec<Principal>> {
        let rows: Vec<Principal> = sqlx::query_as(
            "SELECT * FROM principals WHERE status != 'banned' AND id > $1 ORDER BY id ASC LIMIT $2",
        )
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Removes a principal outright — used when a broadcast discovers the
    /// chat platform has deleted the principal's account.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_principal(&self, principal_id: PrincipalId) -> Result<()> {
        sqlx::query("DELETE FROM principals WHERE id = $1")
            .bind(principal_id.0)
            .execute(&self.pool)
            .await?;
        self.invalidator.invalidate_principal(principal_id.0).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Principal;
    use chrono::NaiveDate;

    fn principal(count: i64, last_date: Option<NaiveDate>) -> Principal {
        Principal {
            id: 1,
            name: "x".into(),
            status: "active".into(),
            ban_reason: None,
            is_premium: false,
            premium_activation_date: None,
            daily_retrieval_count: count,
            last_retrieval_date: last_date,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn effective_count_zeroes_on_stale_date() {
        let today = Utc::now().date_naive();
        let yesterday = today - chrono::Duration::days(1);
        let p = principal(7, Some(yesterday));
        assert_eq!(p.effective_daily_count(today), 0);
    }

    #[test]
    fn effective_count_is_stored_value_when_dated_today() {
        let today = Utc::now().date_naive();
        let p = principal(7, Some(today));
        assert_eq!(p.effective_daily_count(today), 7);
    }
}
