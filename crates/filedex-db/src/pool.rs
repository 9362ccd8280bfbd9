//! Connection pool wrapper over `sqlx::PgPool`, instrumented the way every
//! other I/O boundary in this workspace is: timed, logged, metered.

use std::time::Instant;

use filedex_core::config::DatabaseConfig;
use filedex_core::error::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, instrument};

#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[cfg(test)]
    pub fn from_raw(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[instrument(level = "debug", skip(config))]
pub async fn create_pool(config: &DatabaseConfig) -> Result<DatabasePool> {
    let start = Instant::now();
    debug!("🔧 Creating database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.url)
        .await?;

    metrics::histogram!("db.pool.create.time", start.elapsed().as_secs_f64());
    metrics::counter!("db.pool.connections.checked_out", 0);

    info!(elapsed = ?start.elapsed(), "✅ Database pool created");
    Ok(DatabasePool { pool })
}

#[instrument(level = "debug", skip(pool))]
pub async fn check_pool_health(pool: &PgPool) -> Result<bool> {
    let start = Instant::now();
    let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(pool).await?;
    metrics::histogram!("db.pool.health_check.time", start.elapsed().as_secs_f64());
    Ok(row.0 == 1)
}

#[instrument(level = "debug", skip(pool))]
pub async fn get_active_connections(pool: &PgPool) -> Result<i64> {
    let row: (i64,) =
        sqlx::query_as("SELECT count(*) FROM pg_stat_activity WHERE state = 'active'")
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}
