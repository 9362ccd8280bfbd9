//! The Principal entity and its `AccessDecision` result shapes.

use chrono::{DateTime, NaiveDate, Utc};
use filedex_core::types::{PrincipalId, PrincipalStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Principal {
    pub id: i64,
    pub name: String,
    pub status: String,
    pub ban_reason: Option<String>,
    pub is_premium: bool,
    pub premium_activation_date: Option<DateTime<Utc>>,
    pub daily_retrieval_count: i64,
    pub last_retrieval_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    pub fn id(&self) -> PrincipalId {
        PrincipalId(self.id)
    }

    pub fn status(&self) -> PrincipalStatus {
        match self.status.as_str() {
            "banned" => PrincipalStatus::Banned,
            "inactive" => PrincipalStatus::Inactive,
            _ => PrincipalStatus::Active,
        }
    }

    /// The counter is only meaningful for today; a stale date means the
    /// effective count for any policy decision is 0 even though the
    /// stored value isn't reset until the next increment.
    pub fn effective_daily_count(&self, today: NaiveDate) -> i64 {
        if self.last_retrieval_date == Some(today) {
            self.daily_retrieval_count
        } else {
            0
        }
    }

    pub fn premium_active(&self, premium_duration_days: i64, now: DateTime<Utc>) -> bool {
        match self.premium_activation_date {
            Some(activated) if self.is_premium => {
                activated + chrono::Duration::days(premium_duration_days) > now
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessReason {
    Unlimited,
    Owner,
    Admin,
    Banned(String),
    PremiumActive { remaining_days: i64 },
    DailyLimitReached,
    Allowed { remaining: i64 },
}

impl AccessReason {
    /// True only for the plain `Allowed` reason: every other reason is
    /// either unlimited (unlimited/owner/admin/premium), moot (the
    /// request is already disallowed), or otherwise outside the daily
    /// retrieval count.
    pub fn needs_quota(&self) -> bool {
        matches!(self, AccessReason::Allowed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: AccessReason,
}

impl AccessDecision {
    pub fn needs_quota(&self) -> bool {
        self.reason.needs_quota()
    }
}
