//! Periodic housekeeping.
//!
//! # Responsibilities
//! - Flush the record store snapshot on an interval
//! - Purge expired rate-limit counters
//! - Flush once more when shutdown fires

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::security::RateLimiter;
use crate::store::RecordStore;

pub struct MaintenanceTask {
    store: Arc<dyn RecordStore>,
    limiter: RateLimiter,
    interval: Duration,
}

impl MaintenanceTask {
    pub fn new(store: Arc<dyn RecordStore>, limiter: RateLimiter, interval: Duration) -> Self {
        Self { store, limiter, interval }
    }

    /// One flush + purge pass.
    pub async fn tick(&self) {
        if let Err(e) = self.store.flush().await {
            tracing::error!(error = %e, "Record store flush failed");
        }
        let purged = self.limiter.purge_expired().await;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired rate-limit counters");
        }
    }

    /// Run until shutdown, then flush one last time.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Maintenance task started");

        let mut ticker = time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = shutdown.recv() => {
                    tracing::info!("Maintenance task received shutdown signal");
                    break;
                }
            }
        }

        if let Err(e) = self.store.flush().await {
            tracing::error!(error = %e, "Final record store flush failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::security::{rate_limit_key, MemoryCounterStore};
    use crate::store::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn test_tick_purges_and_shutdown_flushes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        let clock = Arc::new(ManualClock::new(0));
        let counters = Arc::new(MemoryCounterStore::new(clock.clone()));
        let limiter = RateLimiter::new(counters.clone(), Duration::from_millis(100));

        limiter.check(&rate_limit_key("vote", "1.1.1.1"), 5, 60).await;
        assert_eq!(counters.len(), 1);
        clock.advance(61);

        let store = Arc::new(MemoryStore::new(Some(path.clone())));
        let task = MaintenanceTask::new(store, limiter, Duration::from_secs(30));
        task.tick().await;
        assert!(counters.is_empty());
        assert!(path.exists());

        std::fs::remove_file(&path).unwrap();
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(task.run(rx));
        tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(path.exists());
    }
}
