//! Deletion Pipeline: queue-fed batch deletion, keyword-filter deletion,
//! and derived-cache invalidation.

pub mod queue;
pub mod worker;

pub use queue::{DeletionItem, DeletionQueue};
pub use worker::{DeletionStats, DeletionWorker};
