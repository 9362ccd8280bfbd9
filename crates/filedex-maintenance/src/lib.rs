//! Maintenance Loop: a 24h cycle, checked in 6 min ticks so a shutdown
//! signal is observed promptly, that expires stale premium subscriptions
//! and idempotently resets daily quota counters once per calendar day
//! even across restarts.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, instrument};

use filedex_access::{AccessRepository, SettingsView};
use filedex_core::error::Result;

const TICK: Duration = Duration::from_secs(6 * 60);
const BACKOFF_ON_ERROR: Duration = Duration::from_secs(60 * 60);
const LAST_RESET_SETTING_KEY: &str = "maintenance.last_counter_reset_date";

pub struct MaintenanceLoop {
    access: Arc<AccessRepository>,
    settings: Arc<SettingsView>,
    premium_duration_days: i64,
}

impl MaintenanceLoop {
    pub fn new(access: Arc<AccessRepository>, settings: Arc<SettingsView>, premium_duration_days: i64) -> Self {
        Self {
            access,
            settings,
            premium_duration_days,
        }
    }

    /// Runs until `shutdown` fires. A single cycle's work (premium expiry
    /// + the idempotent counter reset check) runs every tick; on error the
    /// loop backs off for an hour before the next attempt rather than
    /// retrying immediately.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_cycle().await {
                Ok(()) => {}
                Err(e) => {
                    error!(error = %e, "maintenance cycle failed, backing off");
                    tokio::select! {
                        _ = shutdown.changed() => { if *shutdown.borrow() { break; } }
                        _ = tokio::time::sleep(BACKOFF_ON_ERROR) => {}
                    }
                    continue;
                }
            }

            tokio::select! {
                _ = shutdown.changed() => { if *shutdown.borrow() { break; } }
                _ = tokio::time::sleep(TICK) => {}
            }
        }
        info!("maintenance loop exiting cleanly");
    }

    #[instrument(level = "debug", skip(self))]
    async fn run_cycle(&self) -> Result<()> {
        let expired = self.access.expire_stale_premium(self.premium_duration_days).await?;
        if expired > 0 {
            info!(expired, "expired stale premium subscriptions");
        }

        self.reset_daily_counters_if_needed().await?;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn reset_daily_counters_if_needed(&self) -> Result<()> {
        let today = Utc::now().date_naive().to_string();

        let last_reset = self
            .settings
            .get(LAST_RESET_SETTING_KEY)
            .await?
            .map(|s| s.value);

        if last_reset.as_deref() == Some(today.as_str()) {
            return Ok(());
        }

        let reset = self.access.reset_all_daily_counters().await?;
        self.settings.set(LAST_RESET_SETTING_KEY, &today, "string").await?;
        info!(reset, today, "reset daily retrieval counters");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    #[test]
    fn tick_is_finer_grained_than_the_cycle() {
        assert!(super::TICK < Duration::from_secs(24 * 60 * 60));
    }
}
