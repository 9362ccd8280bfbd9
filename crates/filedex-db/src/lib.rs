//! Document store: owns the Postgres pool and migrations. Per-entity
//! repositories (principals, media files, ...) live in the crate that owns
//! that component (`filedex-access`, `filedex-index`, ...) and take a
//! `&PgPool` borrowed from here, the same way the rest of the workspace
//! shares one pool across feature crates.

pub mod migrations;
pub mod pool;

use std::time::Instant;

use filedex_core::config::DatabaseConfig;
use filedex_core::error::Result;
use sqlx::postgres::PgPool;
use tracing::{debug, info, instrument};

pub struct Database {
    config: DatabaseConfig,
    pool: Option<PgPool>,
}

impl Database {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config, pool: None }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn initialize(&mut self) -> Result<()> {
        let start = Instant::now();
        debug!("🔧 Initializing document store");

        let db_pool = pool::create_pool(&self.config).await?;
        self.pool = Some(db_pool.pool().clone());
        self.migrate().await?;

        info!(elapsed = ?start.elapsed(), "✅ Document store initialized");
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn migrate(&self) -> Result<()> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| filedex_core::error::Error::System("pool not initialized".into()))?;
        migrations::run_migrations(pool).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn health_check(&self) -> Result<bool> {
        match &self.pool {
            Some(pool) => pool::check_pool_health(pool).await,
            None => Ok(false),
        }
    }
}
