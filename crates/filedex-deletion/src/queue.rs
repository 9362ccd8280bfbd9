//! Bounded queue feeding the deletion worker. Enqueue blocks on capacity,
//! matching the backpressure policy used across the rest of the pipeline
//! rather than dropping deletion requests silently.

use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum DeletionItem {
    ByUniqueId(String),
    ByKeyword(String),
}

pub struct DeletionQueue {
    sender: mpsc::Sender<DeletionItem>,
    receiver: tokio::sync::Mutex<Option<mpsc::Receiver<DeletionItem>>>,
}

impl DeletionQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(Some(receiver)),
        }
    }

    pub async fn enqueue(&self, item: DeletionItem) -> bool {
        self.sender.send(item).await.is_ok()
    }

    pub async fn take_receiver(&self) -> mpsc::Receiver<DeletionItem> {
        self.receiver
            .lock()
            .await
            .take()
            .expect("deletion queue receiver already taken")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueued_items_are_received_in_order() {
        let queue = DeletionQueue::new(4);
        queue.enqueue(DeletionItem::ByUniqueId("a".into())).await;
        queue.enqueue(DeletionItem::ByKeyword("spam".into())).await;

        let mut receiver = queue.take_receiver().await;
        match receiver.recv().await.unwrap() {
            DeletionItem::ByUniqueId(id) => assert_eq!(id, "a"),
            _ => panic!("expected ByUniqueId"),
        }
        match receiver.recv().await.unwrap() {
            DeletionItem::ByKeyword(kw) => assert_eq!(kw, "spam"),
            _ => panic!("expected ByKeyword"),
        }
    }
}
