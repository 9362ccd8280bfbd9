//! Schema migrations for the document store.
//!
//! Raw, idempotent `CREATE TABLE IF NOT EXISTS` statements tracked in an
//! `_migrations` table, matching the rest of the workspace rather than a
//! migration-framework DSL. Every durable entity from the data model gets
//! a table; each carries a JSONB `extra` column for forward-compatible
//! fields the design doesn't enumerate.

use filedex_core::error::Result;
use sqlx::postgres::PgPool;
use tracing::{debug, info, instrument};

pub const MIGRATION_VERSION: &str = "20260101000000";

#[instrument(level = "debug", skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    debug!("🔧 Starting database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version TEXT PRIMARY KEY,
            applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    let migrations: Vec<&str> = vec![
        // Principals
        r#"
        CREATE TABLE IF NOT EXISTS principals (
            id BIGINT PRIMARY KEY,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            ban_reason TEXT,
            is_premium BOOLEAN NOT NULL DEFAULT FALSE,
            premium_activation_date TIMESTAMP WITH TIME ZONE,
            daily_retrieval_count BIGINT NOT NULL DEFAULT 0,
            last_retrieval_date DATE,
            extra JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
        // Media files
        r#"
        CREATE TABLE IF NOT EXISTS media_files (
            file_unique_id TEXT PRIMARY KEY,
            file_id TEXT NOT NULL,
            file_ref TEXT,
            file_name TEXT NOT NULL,
            file_size BIGINT NOT NULL DEFAULT 0,
            file_type TEXT NOT NULL,
            mime_type TEXT,
            caption TEXT,
            extra JSONB NOT NULL DEFAULT '{}',
            indexed_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
        r#"CREATE UNIQUE INDEX IF NOT EXISTS media_files_file_ref_uq
           ON media_files (file_ref) WHERE file_ref IS NOT NULL"#,
        r#"CREATE UNIQUE INDEX IF NOT EXISTS media_files_name_caption_uq
           ON media_files (file_name, COALESCE(caption, ''))"#,
        r#"CREATE INDEX IF NOT EXISTS media_files_type_indexed_idx
           ON media_files (file_type, indexed_at DESC)"#,
        r#"CREATE INDEX IF NOT EXISTS media_files_size_idx ON media_files (file_size)"#,
        r#"CREATE INDEX IF NOT EXISTS media_files_indexed_at_idx ON media_files (indexed_at DESC)"#,
        r#"CREATE INDEX IF NOT EXISTS media_files_name_trgm_idx ON media_files (file_name)"#,
        // Indexed channels
        r#"
        CREATE TABLE IF NOT EXISTS indexed_channels (
            channel_id BIGINT PRIMARY KEY,
            username TEXT,
            title TEXT,
            enabled BOOLEAN NOT NULL DEFAULT TRUE,
            indexed_count BIGINT NOT NULL DEFAULT 0,
            last_indexed_at TIMESTAMP WITH TIME ZONE,
            added_by BIGINT,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
        // Connections (principal -> group bindings)
        r#"
        CREATE TABLE IF NOT EXISTS connections (
            principal_id BIGINT PRIMARY KEY,
            group_ids BIGINT[] NOT NULL DEFAULT '{}',
            active_group BIGINT,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
        // Filters (per-group keyword -> reply)
        r#"
        CREATE TABLE IF NOT EXISTS filters (
            id BIGSERIAL PRIMARY KEY,
            group_id BIGINT NOT NULL,
            text TEXT NOT NULL,
            reply TEXT NOT NULL,
            buttons JSONB,
            file JSONB,
            alert TEXT,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            UNIQUE (group_id, text)
        )
        "#,
        r#"CREATE INDEX IF NOT EXISTS filters_group_idx ON filters (group_id)"#,
        // Batch links
        r#"
        CREATE TABLE IF NOT EXISTS batch_links (
            id TEXT PRIMARY KEY,
            source_chat_id BIGINT NOT NULL,
            from_msg_id BIGINT NOT NULL,
            to_msg_id BIGINT NOT NULL,
            protected BOOLEAN NOT NULL DEFAULT FALSE,
            premium_only BOOLEAN NOT NULL DEFAULT FALSE,
            created_by BIGINT NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            expires_at TIMESTAMP WITH TIME ZONE
        )
        "#,
        r#"CREATE UNIQUE INDEX IF NOT EXISTS batch_links_dedup_uq ON batch_links
           (source_chat_id, from_msg_id, to_msg_id, protected, premium_only, created_by)"#,
        // Bot settings
        r#"
        CREATE TABLE IF NOT EXISTS bot_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            value_type TEXT NOT NULL,
            default_value TEXT,
            description TEXT,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
        )
        "#,
    ];

    for migration in migrations {
        sqlx::query(migration).execute(pool).await?;
    }

    sqlx::query(
        r#"
        INSERT INTO _migrations (version)
        VALUES ($1)
        ON CONFLICT (version) DO NOTHING
        "#,
    )
    .bind(MIGRATION_VERSION)
    .execute(pool)
    .await?;

    info!("✅ Database migrations completed");
    Ok(())
}
