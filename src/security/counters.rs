//! Expiring counter store used by the rate limiter.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::clock::SharedClock;

/// Errors raised by a counter store.
#[derive(Debug, Error)]
pub enum CounterStoreError {
    #[error("counter store unreachable: {0}")]
    Unreachable(String),

    #[error("counter store timed out after {0} ms")]
    Timeout(u64),
}

/// Result of one atomic increment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterState {
    /// No live counter existed; one was created with value 1.
    Created,
    /// The counter was below the limit and now holds this value.
    Incremented(u64),
    /// The counter already held at least `limit`; it was left untouched.
    AtLimit(u64),
}

/// Key-value store with per-key expiry.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically create-or-increment `key` unless it already reached `limit`.
    ///
    /// A created counter expires `ttl_secs` after creation; increments never
    /// extend its lifetime.
    async fn increment_below(
        &self,
        key: &str,
        limit: u64,
        ttl_secs: u64,
    ) -> Result<CounterState, CounterStoreError>;

    /// Drop expired counters. Stores with native expiry need not do anything.
    async fn purge_expired(&self) -> Result<usize, CounterStoreError> {
        Ok(0)
    }
}

#[derive(Debug, Clone, Copy)]
struct Counter {
    value: u64,
    expires_at: u64,
}

/// A thread-safe in-process counter store.
#[derive(Clone)]
pub struct MemoryCounterStore {
    inner: Arc<DashMap<String, Counter>>,
    clock: SharedClock,
}

impl MemoryCounterStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            clock,
        }
    }

    /// Current value of a live counter.
    pub fn get(&self, key: &str) -> Option<u64> {
        let now = self.clock.now_secs();
        self.inner
            .get(key)
            .filter(|c| c.expires_at > now)
            .map(|c| c.value)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment_below(
        &self,
        key: &str,
        limit: u64,
        ttl_secs: u64,
    ) -> Result<CounterState, CounterStoreError> {
        let now = self.clock.now_secs();
        let fresh = Counter {
            value: 1,
            expires_at: now + ttl_secs,
        };
        // The entry guard holds the shard lock for the whole check-and-bump.
        match self.inner.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                Ok(CounterState::Created)
            }
            Entry::Occupied(mut slot) => {
                let counter = slot.get_mut();
                if counter.expires_at <= now {
                    *counter = fresh;
                    Ok(CounterState::Created)
                } else if counter.value >= limit {
                    Ok(CounterState::AtLimit(counter.value))
                } else {
                    counter.value += 1;
                    Ok(CounterState::Incremented(counter.value))
                }
            }
        }
    }

    async fn purge_expired(&self) -> Result<usize, CounterStoreError> {
        let now = self.clock.now_secs();
        let before = self.inner.len();
        self.inner.retain(|_, c| c.expires_at > now);
        Ok(before - self.inner.len())
    }
}
