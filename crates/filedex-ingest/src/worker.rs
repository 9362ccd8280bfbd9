//! The batching worker: drains the primary queue, sizes batches
//! adaptively by queue depth, filters unsupported media, checks
//! duplicates in one round-trip, and bulk-inserts.

use std::sync::Arc;
use std::time::Duration;

use filedex_index::model::IncomingMedia;
use filedex_index::MediaRepository;
use filedex_ratelimit::SemaphoreSet;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::queue::{IngestQueue, RawMessage};

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub total_messages: u64,
    pub total_files: u64,
    pub duplicate: u64,
    pub errors: u64,
    pub deleted: u64,
    pub no_media: u64,
    pub unsupported: u64,
}

impl IngestStats {
    fn merge(&mut self, other: &IngestStats) {
        self.total_messages += other.total_messages;
        self.total_files += other.total_files;
        self.duplicate += other.duplicate;
        self.errors += other.errors;
        self.deleted += other.deleted;
        self.no_media += other.no_media;
        self.unsupported += other.unsupported;
    }
}

/// Chooses the batch size for the next drain given the current queue
/// depth: 20 normally, 30 past 200 items, 50 past 500.
pub fn adaptive_batch_size(queue_depth: usize) -> usize {
    if queue_depth > 500 {
        50
    } else if queue_depth > 200 {
        30
    } else {
        20
    }
}

pub struct IngestWorker {
    queue: Arc<IngestQueue>,
    media_repo: Arc<MediaRepository>,
    semaphores: Arc<SemaphoreSet>,
    batch_deadline: Duration,
    /// Held for the duration of a full indexing run so Mode A (live
    /// watch) and Mode B (admin range index) never interleave.
    run_lock: AsyncMutex<()>,
}

impl IngestWorker {
    pub fn new(
        queue: Arc<IngestQueue>,
        media_repo: Arc<MediaRepository>,
        semaphores: Arc<SemaphoreSet>,
        batch_deadline: Duration,
    ) -> Self {
        Self {
            queue,
            media_repo,
            semaphores,
            batch_deadline,
            run_lock: AsyncMutex::new(()),
        }
    }

    /// Drains the queue in adaptively-sized batches until `shutdown` fires.
    /// Invokes `progress` after each processed batch with the running
    /// totals.
    pub async fn run(
        self: Arc<Self>,
        mut receiver: tokio::sync::mpsc::Receiver<RawMessage>,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
        mut progress: impl FnMut(&IngestStats) + Send,
    ) -> IngestStats {
        let _run_guard = self.run_lock.lock().await;
        let mut stats = IngestStats::default();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let batch_size = adaptive_batch_size(self.queue.len());
            let mut batch = Vec::with_capacity(batch_size);
            let deadline = Instant::now() + self.batch_deadline;

            while batch.len() < batch_size {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() { break; }
                    }
                    msg = receiver.recv() => {
                        match msg {
                            Some(m) => batch.push(m),
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep_until(deadline) => break,
                }
            }

            if batch.is_empty() {
                if *shutdown.borrow() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
                continue;
            }

            let batch_stats = self.process_batch(batch).await;
            stats.merge(&batch_stats);
            progress(&stats);
        }

        info!(?stats, "ingestion worker drained and exiting");
        stats
    }

    #[instrument(level = "debug", skip(self, batch))]
    async fn process_batch(&self, batch: Vec<RawMessage>) -> IngestStats {
        let mut stats = IngestStats::default();
        stats.total_messages = batch.len() as u64;

        let candidates: Vec<IncomingMedia> = batch.into_iter().map(|m| m.media).collect();
        // Unsupported/no-media filtering happens before this point at the
        // extraction boundary (the bot layer only ever constructs an
        // IncomingMedia for {video, audio, document}); this worker only
        // sees already-classified candidates.

        let ids: Vec<String> = candidates.iter().map(|c| c.file_unique_id.clone()).collect();
        let duplicates = match self.media_repo.batch_check_duplicates(&ids).await {
            Ok(map) => map,
            Err(e) => {
                debug!(error = %e, "batch duplicate check failed, treating all as new");
                Default::default()
            }
        };

        let mut to_save = Vec::new();
        for candidate in candidates {
            if duplicates.get(&candidate.file_unique_id).map(|v| v.is_some()).unwrap_or(false) {
                stats.duplicate += 1;
            } else {
                to_save.push(candidate);
            }
        }

        if !to_save.is_empty() {
            let _permit = self.semaphores.acquire("database_write").await;
            match self.media_repo.bulk_save_media(&to_save).await {
                Ok(outcome) => {
                    stats.total_files += outcome.saved;
                    stats.errors += outcome.errors;
                }
                Err(_) => stats.errors += to_save.len() as u64,
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_size_scales_with_queue_depth() {
        assert_eq!(adaptive_batch_size(0), 20);
        assert_eq!(adaptive_batch_size(201), 30);
        assert_eq!(adaptive_batch_size(501), 50);
    }

    #[test]
    fn stats_merge_preserves_the_conservation_invariant() {
        let mut total = IngestStats::default();
        let batch1 = IngestStats {
            total_messages: 4,
            total_files: 2,
            duplicate: 2,
            ..Default::default()
        };
        total.merge(&batch1);
        assert_eq!(
            total.total_messages,
            total.total_files + total.duplicate + total.errors + total.deleted + total.no_media + total.unsupported
        );
    }
}
