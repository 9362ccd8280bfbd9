//! Rate & Flood Control: sliding-window action counters, a distributed
//! token bucket, a process-local circuit breaker, and a named semaphore
//! set — the four sub-parts every outbound platform call is routed
//! through.

pub mod action_limiter;
pub mod circuit_breaker;
pub mod semaphores;
pub mod token_bucket;

pub use action_limiter::ActionLimiter;
pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use semaphores::SemaphoreSet;
pub use token_bucket::TokenBucket;
