//! Process-local circuit breaker keyed by logical endpoint. After
//! `failure_threshold` consecutive failures the breaker opens for
//! `timeout`; a single success resets the failure count. State lives in
//! this process only — it is not shared across replicas.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
}

struct EndpointState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

pub struct CircuitBreaker {
    failure_threshold: u32,
    timeout: Duration,
    endpoints: Mutex<HashMap<String, EndpointState>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, timeout: Duration) -> Self {
        Self {
            failure_threshold,
            timeout,
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self, endpoint: &str) -> CircuitState {
        let mut map = self.endpoints.lock().unwrap();
        let entry = map.entry(endpoint.to_string()).or_insert(EndpointState {
            consecutive_failures: 0,
            opened_at: None,
        });

        if let Some(opened_at) = entry.opened_at {
            if opened_at.elapsed() >= self.timeout {
                entry.opened_at = None;
                entry.consecutive_failures = 0;
                CircuitState::Closed
            } else {
                CircuitState::Open
            }
        } else {
            CircuitState::Closed
        }
    }

    pub fn record_success(&self, endpoint: &str) {
        let mut map = self.endpoints.lock().unwrap();
        if let Some(entry) = map.get_mut(endpoint) {
            entry.consecutive_failures = 0;
            entry.opened_at = None;
        }
    }

    pub fn record_failure(&self, endpoint: &str) {
        let mut map = self.endpoints.lock().unwrap();
        let entry = map.entry(endpoint.to_string()).or_insert(EndpointState {
            consecutive_failures: 0,
            opened_at: None,
        });
        entry.consecutive_failures += 1;
        if entry.consecutive_failures >= self.failure_threshold {
            entry.opened_at = Some(Instant::now());
        }
    }

    /// Runs `f` through the breaker: short-circuits with `None` when open,
    /// otherwise runs it and records the outcome.
    pub async fn call<F, Fut, T, E>(&self, endpoint: &str, f: F) -> Option<Result<T, E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if self.state(endpoint) == CircuitState::Open {
            return None;
        }

        let result = f().await;
        match &result {
            Ok(_) => self.record_success(endpoint),
            Err(_) => self.record_failure(endpoint),
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_and_closes_after_timeout() {
        let breaker = CircuitBreaker::new(2, Duration::from_millis(50));

        let _: Option<Result<(), &str>> = breaker.call("svc", || async { Err("boom") }).await;
        assert_eq!(breaker.state("svc"), CircuitState::Closed);
        let _: Option<Result<(), &str>> = breaker.call("svc", || async { Err("boom") }).await;
        assert_eq!(breaker.state("svc"), CircuitState::Open);

        let short_circuited: Option<Result<(), &str>> =
            breaker.call("svc", || async { Ok(()) }).await;
        assert!(short_circuited.is_none());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(breaker.state("svc"), CircuitState::Closed);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        let _: Option<Result<(), &str>> = breaker.call("svc", || async { Err("boom") }).await;
        let _: Option<Result<(), &str>> = breaker.call("svc", || async { Ok(()) }).await;
        let _: Option<Result<(), &str>> = breaker.call("svc", || async { Err("boom") }).await;
        assert_eq!(breaker.state("svc"), CircuitState::Closed);
    }
}
