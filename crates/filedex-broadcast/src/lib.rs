//! Broadcast Engine: batched fan-out across all non-banned principals
//! with adaptive pacing and outcome classification.

pub mod classify;
pub mod engine;

pub use classify::{classify_failure, FailureClass};
pub use engine::{BroadcastEngine, BroadcastReport};
