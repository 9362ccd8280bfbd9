//! Periodic task that moves items from the overflow buffer back into the
//! primary queue whenever there is headroom, and — in live-watch mode —
//! reconciles the monitored-channel set against the `IndexedChannel` store
//! on the same tick cadence.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::queue::IngestQueue;

pub async fn run_reconciler(
    queue: Arc<IngestQueue>,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() { break; }
            }
            _ = ticker.tick() => {
                let moved = queue.reconcile();
                if moved > 0 {
                    debug!(moved, "reconciled overflow into primary queue");
                }
            }
        }
    }
}
