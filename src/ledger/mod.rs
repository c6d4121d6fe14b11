//! Accepted votes and the queries that guard them.
//!
//! # Design Decisions
//! - `record` delegates the duplicate and cap checks to the store's atomic
//!   commit; the earlier read-only checks only pick the rejection message
//! - The per-IP cap is a soft cap: counting and inserting are separate
//!   transactions, so concurrent votes from one IP may overshoot slightly

use std::sync::Arc;

use crate::clock::SharedClock;
use crate::observability::metrics;
use crate::sessions::EscalationReason;
use crate::store::{CommitOutcome, NewVote, RecordStore, StoreResult, VoteStats};

/// How a vote was vouched for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationFlags {
    pub captcha: bool,
    pub sms: bool,
}

#[derive(Clone)]
pub struct VoteLedger {
    store: Arc<dyn RecordStore>,
    clock: SharedClock,
}

impl VoteLedger {
    pub fn new(store: Arc<dyn RecordStore>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    pub async fn has_voted(&self, fingerprint: &str, contestant: &str) -> StoreResult<bool> {
        self.store.has_vote(fingerprint, contestant).await
    }

    /// Votes from `ip` across every fingerprint.
    pub async fn count_votes_from_ip(&self, ip: &str) -> StoreResult<u64> {
        self.store.count_votes_by_ip(ip).await
    }

    /// Votes from `fingerprint` inside the trailing `window_secs`.
    pub async fn count_recent_votes(&self, fingerprint: &str, window_secs: u64) -> StoreResult<u64> {
        let since = self.clock.now_secs().saturating_sub(window_secs);
        self.store.count_votes_since(fingerprint, since).await
    }

    /// Commit a vote and bump the device's count in one transaction.
    pub async fn record(
        &self,
        fingerprint: &str,
        contestant: &str,
        ip: &str,
        flags: VerificationFlags,
        max_votes_per_device: u32,
    ) -> StoreResult<CommitOutcome> {
        let vote = NewVote {
            fingerprint: fingerprint.to_string(),
            contestant: contestant.to_string(),
            ip_address: ip.to_string(),
            created_at: self.clock.now_secs(),
            verified_via_captcha: flags.captcha,
            verified_via_sms: flags.sms,
        };
        self.store.commit_vote(vote, max_votes_per_device).await
    }

    /// Flag every device last seen on `ip`.
    pub async fn mark_all_sessions_from_ip_suspicious(&self, ip: &str) -> StoreResult<usize> {
        let changed = self
            .store
            .mark_suspicious_by_ip(ip, self.clock.now_secs())
            .await?;
        if changed > 0 {
            tracing::warn!(
                ip = %ip,
                sessions = changed,
                reason = EscalationReason::IpCapReached.as_str(),
                "Sessions sharing IP escalated to suspicious"
            );
            metrics::record_escalations(EscalationReason::IpCapReached.as_str(), changed as u64);
        }
        Ok(changed)
    }

    pub async fn stats(&self) -> StoreResult<VoteStats> {
        self.store.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_recent_votes_window() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(1_000));
        let ledger = VoteLedger::new(store.clone(), clock.clone());
        store.refresh_session("fp", "t", 5_000, "1.1.1.1", 1_000).await.unwrap();

        ledger.record("fp", "alice", "1.1.1.1", VerificationFlags::default(), 3).await.unwrap();
        clock.advance(30);
        ledger.record("fp", "bob", "1.1.1.1", VerificationFlags::default(), 3).await.unwrap();

        assert_eq!(ledger.count_recent_votes("fp", 60).await.unwrap(), 2);
        clock.advance(31);
        assert_eq!(ledger.count_recent_votes("fp", 60).await.unwrap(), 1);
        assert_eq!(ledger.count_votes_from_ip("1.1.1.1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_record_carries_flags() {
        let store = Arc::new(MemoryStore::default());
        let clock = Arc::new(ManualClock::new(0));
        let ledger = VoteLedger::new(store.clone(), clock);
        store.refresh_session("fp", "t", 100, "1.1.1.1", 0).await.unwrap();

        let flags = VerificationFlags { captcha: true, sms: false };
        ledger.record("fp", "alice", "1.1.1.1", flags, 3).await.unwrap();

        let votes = store.votes().unwrap();
        assert!(votes[0].verified_via_captcha);
        assert!(!votes[0].verified_via_sms);
    }
}
