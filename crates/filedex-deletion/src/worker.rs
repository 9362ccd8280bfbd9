//! Drains the deletion queue in 5-second windows of up to 50 items,
//! deleting each from the media index (which handles its own cache
//! invalidation), and emits a summary to the admin log only when any
//! deletions actually happened in the window.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, instrument};

use filedex_index::MediaRepository;

use crate::queue::DeletionItem;

const WINDOW: Duration = Duration::from_secs(5);
const MAX_PER_WINDOW: usize = 50;

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeletionStats {
    pub deleted: u64,
    pub not_found: u64,
    pub errors: u64,
}

impl DeletionStats {
    fn merge(&mut self, other: &DeletionStats) {
        self.deleted += other.deleted;
        self.not_found += other.not_found;
        self.errors += other.errors;
    }

    fn any_deletions(&self) -> bool {
        self.deleted > 0
    }
}

pub struct DeletionWorker {
    media: Arc<MediaRepository>,
}

impl DeletionWorker {
    pub fn new(media: Arc<MediaRepository>) -> Self {
        Self { media }
    }

    /// Drains `receiver` until `shutdown` fires, in windows of at most
    /// `MAX_PER_WINDOW` items spanning at most `WINDOW`, invoking
    /// `admin_log` with a running summary whenever a window deleted
    /// anything.
    pub async fn run(
        self: Arc<Self>,
        mut receiver: tokio::sync::mpsc::Receiver<DeletionItem>,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
        mut admin_log: impl FnMut(&DeletionStats) + Send,
    ) -> DeletionStats {
        let mut totals = DeletionStats::default();

        loop {
            if *shutdown.borrow() {
                break;
            }

            let mut batch = Vec::with_capacity(MAX_PER_WINDOW);
            let deadline = Instant::now() + WINDOW;

            while batch.len() < MAX_PER_WINDOW {
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() { break; }
                    }
                    item = receiver.recv() => {
                        match item {
                            Some(i) => batch.push(i),
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
                continue;
            }

            let window_stats = self.process_window(batch).await;
            totals.merge(&window_stats);
            if window_stats.any_deletions() {
                admin_log(&totals);
            }
        }

        info!(?totals, "deletion worker drained and exiting");
        totals
    }

    #[instrument(level = "debug", skip(self, batch))]
    async fn process_window(&self, batch: Vec<DeletionItem>) -> DeletionStats {
        let mut stats = DeletionStats::default();

        for item in batch {
            match item {
                DeletionItem::ByUniqueId(id) => match self.media.delete_by_unique_id(&id).await {
                    Ok(true) => stats.deleted += 1,
                    Ok(false) => stats.not_found += 1,
                    Err(_) => stats.errors += 1,
                },
                DeletionItem::ByKeyword(keyword) => match self.media.delete_files_by_keyword(&keyword).await {
                    Ok(n) => stats.deleted += n,
                    Err(_) => stats.errors += 1,
                },
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_only_fires_when_something_was_deleted() {
        let mut all_not_found = DeletionStats::default();
        all_not_found.not_found = 3;
        assert!(!all_not_found.any_deletions());

        let mut some_deleted = DeletionStats::default();
        some_deleted.deleted = 1;
        assert!(some_deleted.any_deletions());
    }

    #[test]
    fn merge_accumulates_across_windows() {
        let mut totals = DeletionStats::default();
        totals.merge(&DeletionStats {
            deleted: 2,
            not_found: 1,
            errors: 0,
        });
        totals.merge(&DeletionStats {
            deleted: 3,
            not_found: 0,
            errors: 1,
        });
        assert_eq!(totals.deleted, 5);
        assert_eq!(totals.not_found, 1);
        assert_eq!(totals.errors, 1);
    }
}
