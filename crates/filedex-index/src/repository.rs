//! Media index repository: the canonical store and search surface.

use std::collections::HashMap;
use std::sync::Arc;

use filedex_cache::{CacheStore, Invalidator};
use filedex_core::error::Result;
use sqlx::PgPool;
use tracing::instrument;

use crate::model::{
    normalize_file_name, BulkSaveOutcome, FileStats, IncomingMedia, MediaFile, SaveOutcome,
    SaveStatus, TypeStat,
};
use crate::search::build_search_regex;

pub struct MediaRepository {
    pool: PgPool,
    cache: Arc<dyn CacheStore>,
    invalidator: Arc<Invalidator>,
    media_ttl_secs: u64,
}

impl MediaRepository {
    pub fn new(
        pool: PgPool,
        cache: Arc<dyn CacheStore>,
        invalidator: Arc<Invalidator>,
        media_ttl_secs: u64,
    ) -> Self {
        Self {
            pool,
            cache,
            invalidator,
            media_ttl_secs,
        }
    }

    #[instrument(level = "debug", skip(self, media))]
    pub async fn save_media(&self, media: &IncomingMedia) -> Result<SaveOutcome> {
        if let Some(existing) = self.find_by_unique_id_uncached(&media.file_unique_id).await? {
            return Ok(SaveOutcome {
                ok: true,
                status: SaveStatus::Duplicate,
                existing: Some(existing),
            });
        }

        let name = normalize_file_name(&media.file_name);
        let inserted: Option<MediaFile> = sqlx::query_as(
            r#"
            INSERT INTO media_files
                (file_unique_id, file_id, file_ref, file_name, file_size, file_type, mime_type, caption)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (file_unique_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&media.file_unique_id)
        .bind(&media.file_id)
        .bind(&media.file_ref)
        .bind(&name)
        .bind(media.file_size)
        .bind(media.file_type.as_str())
        .bind(&media.mime_type)
        .bind(&media.caption)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(_) => {
                self.invalidator.invalidate_search_results().await;
                self.invalidator.invalidate_file_stats().await;
                Ok(SaveOutcome {
                    ok: true,
                    status: SaveStatus::Saved,
                    existing: None,
                })
            }
            None => {
                // Lost a race against a concurrent insert of the same
                // file_unique_id or the name+caption unique guard.
                let existing = self.find_by_unique_id_uncached(&media.file_unique_id).await?;
                Ok(SaveOutcome {
                    ok: true,
                    status: SaveStatus::Duplicate,
                    existing,
                })
            }
        }
    }

    async fn find_by_unique_id_uncached(&self, file_unique_id: &str) -> Result<Option<MediaFile>> {
        Ok(sqlx::query_as("SELECT * FROM media_files WHERE file_unique_id = $1")
            .bind(file_unique_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn find_file(&self, identifier: &str) -> Result<Option<MediaFile>> {
        let cache_key = format!("file:uid:{identifier}");
        if let Some(v) = self.cache.get(&cache_key).await {
            if let Ok(file) = serde_json::from_value(v) {
                return Ok(Some(file));
            }
        }

        let file = self.find_by_unique_id_uncached(identifier).await?;
        if let Some(ref f) = file {
            if let Ok(v) = serde_json::to_value(f) {
                self.cache.set(&cache_key, &v, Some(self.media_ttl_secs)).await;
            }
        }
        Ok(file)
    }

    /// Single indexed query for all ids in a batch; used by ingestion.
    #[instrument(level = "debug", skip(self, file_unique_ids))]
    pub async fn batch_check_duplicates(
        &self,
        file_unique_ids: &[String],
    ) -> Result<HashMap<String, Option<MediaFile>>> {
        if file_unique_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let existing: Vec<MediaFile> =
            sqlx::query_as("SELECT * FROM media_files WHERE file_unique_id = ANY($1)")
                .bind(file_unique_ids)
                .fetch_all(&self.pool)
                .await?;

        let mut by_id: HashMap<String, MediaFile> = existing
            .into_iter()
            .map(|f| (f.file_unique_id.clone(), f))
            .collect();

        Ok(file_unique_ids
            .iter()
            .map(|id| (id.clone(), by_id.remove(id)))
            .collect())
    }

    /// Unordered bulk insert: one duplicate or bad row does not abort the
    /// batch. Falls back to per-row insert on a batch-level failure.
    #[instrument(level = "debug", skip(self, files))]
    pub async fn bulk_save_media(&self, files: &[IncomingMedia]) -> Result<BulkSaveOutcome> {
        if files.is_empty() {
            return Ok(BulkSaveOutcome::default());
        }

        match self.bulk_insert(files).await {
            Ok(saved) => {
                if saved > 0 {
                    self.invalidator.invalidate_search_results().await;
                    self.invalidator.invalidate_file_stats().await;
                }
                Ok(BulkSaveOutcome { saved, errors: 0 })
            }
            Err(_) => {
                // Batch-level failure: fall back to per-row inserts so one
                // bad row doesn't poison the whole batch.
                let mut saved = 0u64;
                let mut errors = 0u64;
                for media in files {
                    match self.save_media(media).await {
                        Ok(outcome) if matches!(outcome.status, SaveStatus::Saved) => saved += 1,
                        Ok(_) => {}
                        Err(_) => errors += 1,
                    }
                }
                Ok(BulkSaveOutcome { saved, errors })
            }
        }
    }

    async fn bulk_insert(&self, files: &[IncomingMedia]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut saved = 0u64;
        for media in files {
            let name = normalize_file_name(&media.file_name);
            let result = sqlx::query(
                r#"
                INSERT INTO media_files
                    (file_unique_id, file_id, file_ref, file_name, file_size, file_type, mime_type, caption)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (file_unique_id) DO NOTHING
                "#,
            )
            .bind(&media.file_unique_id)
            .bind(&media.file_id)
            .bind(&media.file_ref)
            .bind(&name)
            .bind(media.file_size)
            .bind(media.file_type.as_str())
            .bind(&media.mime_type)
            .bind(&media.caption)
            .execute(&mut *tx)
            .await?;
            saved += result.rows_affected();
        }
        tx.commit().await?;
        Ok(saved)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn search_files(
        &self,
        query: &str,
        file_type: Option<&str>,
        offset: i64,
        limit: i64,
        use_caption: bool,
    ) -> Result<(Vec<MediaFile>, i64, i64)> {
        let version = self.invalidator.search_version().await;
        let cache_key = format!(
            "search:v{version}:{}:{}:{}:{}:{}",
            query, file_type.unwrap_or(""), offset, limit, use_caption
        );

        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Ok((files, total)) = serde_json::from_value::<(Vec<MediaFile>, i64)>(cached) {
                let next_offset = if offset + limit < total { offset + limit } else { -1 };
                return Ok((files, next_offset, total));
            }
        }

        // regex is validated at the call boundary; filtering happens in
        // application code since Postgres regex dialect diverges from the
        // token-boundary pattern here.
        let regex = build_search_regex(query).map_err(|e| {
            filedex_core::error::Error::InvalidInput(format!("bad search query: {e}"))
        })?;

        let rows: Vec<MediaFile> = match file_type {
            Some(ft) => {
                sqlx::query_as("SELECT * FROM media_files WHERE file_type = $1 ORDER BY indexed_at DESC")
                    .bind(ft)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM media_files ORDER BY indexed_at DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let matched: Vec<MediaFile> = rows
            .into_iter()
            .filter(|f| {
                regex.is_match(&f.file_name)
                    || (use_caption && f.caption.as_deref().map(|c| regex.is_match(c)).unwrap_or(false))
            })
            .collect();

        let total = matched.len() as i64;
        let page: Vec<MediaFile> = matched
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();

        if let Ok(v) = serde_json::to_value((&page, total)) {
            self.cache.set(&cache_key, &v, Some(600)).await;
        }

        let next_offset = if offset + limit < total { offset + limit } else { -1 };
        Ok((page, next_offset, total))
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn delete_files_by_keyword(&self, keyword: &str) -> Result<u64> {
        let regex = build_search_regex(keyword).map_err(|e| {
            filedex_core::error::Error::InvalidInput(format!("bad keyword: {e}"))
        })?;

        let rows: Vec<MediaFile> = sqlx::query_as("SELECT * FROM media_files")
            .fetch_all(&self.pool)
            .await?;
        let matching: Vec<String> = rows
            .into_iter()
            .filter(|f| regex.is_match(&f.file_name))
            .map(|f| f.file_unique_id)
            .collect();

        if matching.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM media_files WHERE file_unique_id = ANY($1)")
            .bind(&matching)
            .execute(&self.pool)
            .await?;

        for id in &matching {
            self.invalidator.invalidate_file(id, "", None).await;
        }
        self.invalidator.invalidate_file_stats().await;
        self.invalidator.invalidate_search_results().await;

        Ok(result.rows_affected())
    }

    /// Deletes a single file by its unique id, invalidating every cache
    /// entry keyed off it plus the stats and search-version views. Returns
    /// `true` if a row was actually removed.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_by_unique_id(&self, file_unique_id: &str) -> Result<bool> {
        let existing = self.find_by_unique_id_uncached(file_unique_id).await?;
        let Some(file) = existing else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM media_files WHERE file_unique_id = $1")
            .bind(file_unique_id)
            .execute(&self.pool)
            .await?;

        self.invalidator
            .invalidate_file(file_unique_id, &file.file_id, file.file_ref.as_deref())
            .await;
        self.invalidator.invalidate_file_stats().await;
        self.invalidator.invalidate_search_results().await;

        Ok(true)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get_file_stats(&self) -> Result<FileStats> {
        if let Some(cached) = self.cache.get("files:stats").await {
            if let Ok(stats) = serde_json::from_value(cached) {
                return Ok(stats);
            }
        }

        let totals: (i64, i64) =
            sqlx::query_as("SELECT count(*), COALESCE(sum(file_size), 0) FROM media_files")
                .fetch_one(&self.pool)
                .await?;

        let by_type_rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT file_type, count(*), COALESCE(sum(file_size), 0) FROM media_files GROUP BY file_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let stats = FileStats {
            total_count: totals.0,
            total_size: totals.1,
            by_type: by_type_rows
                .into_iter()
                .map(|(file_type, count, size)| TypeStat { file_type, count, size })
                .collect(),
        };

        if let Ok(v) = serde_json::to_value(&stats) {
            self.cache.set("files:stats", &v, Some(300)).await;
        }
        Ok(stats)
    }
}
