//! Fixed-window rate limiting over the counter store.
//!
//! The window starts with the first request for a key and lasts
//! `window_secs`; a client can therefore land up to `2 × limit` requests
//! around a window boundary. Rejected requests do not consume quota.
//!
//! If the counter store errors or misses its deadline the request is
//! allowed with a count of 0 (fail open). Voting stays available during a
//! counter store outage at the cost of abuse protection.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::observability::metrics;
use crate::security::counters::{CounterState, CounterStore, CounterStoreError};

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub count: u64,
}

impl From<CounterState> for RateDecision {
    fn from(state: CounterState) -> Self {
        match state {
            CounterState::Created => Self { allowed: true, count: 1 },
            CounterState::Incremented(count) => Self { allowed: true, count },
            CounterState::AtLimit(count) => Self { allowed: false, count },
        }
    }
}

/// Build the counter key for a scope and identity, e.g. `("vote", ip)`.
pub fn rate_limit_key(scope: &str, identity: &str) -> String {
    format!("rate_limit:{}:{}", scope, identity)
}

/// Rate limiter backed by shared counters.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    deadline: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// Count one request against `key`.
    pub async fn check(&self, key: &str, limit: u64, window_secs: u64) -> RateDecision {
        let attempt = timeout(self.deadline, self.store.increment_below(key, limit, window_secs));
        let result = match attempt.await {
            Ok(result) => result,
            Err(_) => Err(CounterStoreError::Timeout(self.deadline.as_millis() as u64)),
        };

        match result {
            Ok(state) => {
                let decision = RateDecision::from(state);
                if !decision.allowed {
                    tracing::debug!(key = %key, count = decision.count, limit, "Rate limit reached");
                }
                decision
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Counter store failed, allowing request");
                metrics::record_counter_fail_open();
                RateDecision { allowed: true, count: 0 }
            }
        }
    }

    /// Drop expired counters from stores that need manual expiry.
    pub async fn purge_expired(&self) -> usize {
        match timeout(self.deadline, self.store.purge_expired()).await {
            Ok(Ok(purged)) => purged,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Counter purge failed");
                0
            }
            Err(_) => {
                tracing::warn!("Counter purge timed out");
                0
            }
        }
    }
}
