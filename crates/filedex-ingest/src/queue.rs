//! Bounded primary queue + overflow buffer with drop-oldest-on-full
//! backpressure, matching the ingestion design's two-stage spillover.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use filedex_index::model::IncomingMedia;
use tokio::sync::{mpsc, Notify};
use tracing::warn;

pub struct RawMessage {
    pub media: IncomingMedia,
    pub received_at: Instant,
}

pub struct IngestQueue {
    sender: mpsc::Sender<RawMessage>,
    receiver: Mutex<Option<mpsc::Receiver<RawMessage>>>,
    overflow: Mutex<VecDeque<RawMessage>>,
    overflow_capacity: usize,
    last_drop_warning: Mutex<Option<Instant>>,
    drop_count_since_alert: Mutex<u64>,
    reconcile_notify: Notify,
}

pub struct EnqueueOutcome {
    pub accepted: bool,
    pub dropped_oldest: bool,
}

impl IngestQueue {
    pub fn new(primary_capacity: usize, overflow_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(primary_capacity);
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            overflow: Mutex::new(VecDeque::new()),
            overflow_capacity,
            last_drop_warning: Mutex::new(None),
            drop_count_since_alert: Mutex::new(0),
            reconcile_notify: Notify::new(),
        }
    }

    pub fn take_receiver(&self) -> mpsc::Receiver<RawMessage> {
        self.receiver
            .lock()
            .unwrap()
            .take()
            .expect("ingest queue receiver already taken")
    }

    /// Enqueues a message: primary queue first, then overflow, then drop
    /// the oldest overflow item with a rate-limited warning.
    pub fn enqueue(&self, message: RawMessage) -> EnqueueOutcome {
        match self.sender.try_send(message) {
            Ok(()) => EnqueueOutcome {
                accepted: true,
                dropped_oldest: false,
            },
            Err(mpsc::error::TrySendError::Full(message)) => self.enqueue_overflow(message),
            Err(mpsc::error::TrySendError::Closed(_)) => EnqueueOutcome {
                accepted: false,
                dropped_oldest: false,
            },
        }
    }

    fn enqueue_overflow(&self, message: RawMessage) -> EnqueueOutcome {
        let mut overflow = self.overflow.lock().unwrap();
        if overflow.len() < self.overflow_capacity {
            overflow.push_back(message);
            return EnqueueOutcome {
                accepted: true,
                dropped_oldest: false,
            };
        }

        overflow.pop_front();
        overflow.push_back(message);
        drop(overflow);

        self.warn_on_drop();
        EnqueueOutcome {
            accepted: true,
            dropped_oldest: true,
        }
    }

    fn warn_on_drop(&self) {
        let should_log = {
            let mut last = self.last_drop_warning.lock().unwrap();
            let now = Instant::now();
            let due = last.map(|t| now.duration_since(t) >= Duration::from_secs(60)).unwrap_or(true);
            if due {
                *last = Some(now);
            }
            due
        };
        if should_log {
            warn!("ingestion overflow full, dropping oldest item");
        }

        let mut count = self.drop_count_since_alert.lock().unwrap();
        *count += 1;
        if *count >= 10 {
            warn!(dropped = *count, "operator alert: sustained ingestion drops");
            *count = 0;
        }
    }

    /// Moves items from overflow back into the primary queue whenever
    /// there is headroom. Called by the reconciler task on a tick.
    pub fn reconcile(&self) -> usize {
        let mut moved = 0;
        loop {
            let next = {
                let mut overflow = self.overflow.lock().unwrap();
                overflow.pop_front()
            };
            let Some(message) = next else { break };

            match self.sender.try_send(message) {
                Ok(()) => moved += 1,
                Err(mpsc::error::TrySendError::Full(message)) => {
                    // No headroom right now; push it back to the front and stop.
                    self.overflow.lock().unwrap().push_front(message);
                    break;
                }
                Err(mpsc::error::TrySendError::Closed(_)) => break,
            }
        }
        moved
    }

    pub fn overflow_len(&self) -> usize {
        self.overflow.lock().unwrap().len()
    }

    /// Current depth of the primary bounded channel, derived from the
    /// sender's spare-capacity delta rather than a separate counter.
    pub fn len(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notify_reconcile(&self) {
        self.reconcile_notify.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedex_core::types::FileType;

    fn media(id: &str) -> IncomingMedia {
        IncomingMedia {
            file_id: id.to_string(),
            file_unique_id: id.to_string(),
            file_ref: None,
            file_name: "x.mp4".to_string(),
            file_size: 10,
            file_type: FileType::Video,
            mime_type: None,
            caption: None,
        }
    }

    #[test]
    fn overflow_at_capacity_drops_oldest() {
        let q = IngestQueue::new(1, 2);
        let _rx = q.take_receiver();

        assert!(q.enqueue(RawMessage { media: media("primary"), received_at: Instant::now() }).accepted);
        assert!(!q
            .enqueue(RawMessage { media: media("o1"), received_at: Instant::now() })
            .dropped_oldest);
        assert!(!q
            .enqueue(RawMessage { media: media("o2"), received_at: Instant::now() })
            .dropped_oldest);
        let outcome = q.enqueue(RawMessage { media: media("o3"), received_at: Instant::now() });
        assert!(outcome.accepted);
        assert!(outcome.dropped_oldest);
        assert_eq!(q.overflow_len(), 2);
    }

    #[test]
    fn len_tracks_primary_queue_depth() {
        let q = IngestQueue::new(4, 4);
        let _rx = q.take_receiver();
        assert_eq!(q.len(), 0);
        assert!(q.is_empty());

        q.enqueue(RawMessage { media: media("a"), received_at: Instant::now() });
        q.enqueue(RawMessage { media: media("b"), received_at: Instant::now() });
        assert_eq!(q.len(), 2);
        assert!(!q.is_empty());
    }

    #[test]
    fn reconcile_pushes_message_back_to_overflow_front_when_primary_is_full() {
        let q = IngestQueue::new(1, 4);
        let _rx = q.take_receiver();

        assert!(q.enqueue(RawMessage { media: media("primary"), received_at: Instant::now() }).accepted);
        q.enqueue(RawMessage { media: media("o1"), received_at: Instant::now() });
        q.enqueue(RawMessage { media: media("o2"), received_at: Instant::now() });

        let moved = q.reconcile();
        assert_eq!(moved, 0, "primary queue has no headroom, nothing should move");
        assert_eq!(q.overflow_len(), 2, "no item should be lost when try_send fails");
    }
}
