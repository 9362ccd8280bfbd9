//! Ingestion Pipeline: bounded queue + overflow, adaptive batching,
//! duplicate-checked bulk persistence, and the admin range-index driver.

pub mod queue;
pub mod range;
pub mod reconciler;
pub mod worker;

pub use queue::{EnqueueOutcome, IngestQueue, RawMessage};
pub use range::slice_range;
pub use reconciler::run_reconciler;
pub use worker::{adaptive_batch_size, IngestStats, IngestWorker};
