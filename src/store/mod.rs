//! Durable record store.
//!
//! # Data Flow
//! ```text
//! SessionRegistry ─┐
//!                  ├─▶ RecordStore (trait) ─▶ MemoryStore (+ JSON snapshot)
//! VoteLedger ──────┘
//! ```
//!
//! # Design Decisions
//! - Each trait method is one transaction; callers never compose
//!   read-then-write sequences for invariants
//! - `commit_vote` owns the (fingerprint, contestant) unique constraint and
//!   the conditional `votes_used < cap` increment
//! - Audit tables are append-only

pub mod memory;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use types::{
    CommitOutcome, IpChangeLog, NewVote, RateLimitLog, Session, SessionRefresh, Vote, VoteStats,
};

/// Errors raised by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Transactional operations over sessions, votes and audit logs.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_session(&self, fingerprint: &str) -> StoreResult<Option<Session>>;

    /// Create the session, or replace its token, expiry and IP.
    ///
    /// When the stored IP differs from `ip` the session is escalated in the
    /// same transaction and the old address is reported back.
    async fn refresh_session(
        &self,
        fingerprint: &str,
        token: &str,
        expires_at: u64,
        ip: &str,
        now: u64,
    ) -> StoreResult<SessionRefresh>;

    /// Record a new client IP for the session. Returns the previous IP if it changed.
    async fn update_session_ip(&self, fingerprint: &str, ip: &str, now: u64)
        -> StoreResult<Option<String>>;

    /// One-way suspicion flag. Returns true if the flag was newly set.
    async fn mark_suspicious(&self, fingerprint: &str, now: u64) -> StoreResult<bool>;

    /// Flag every session whose last IP is `ip`. Returns how many changed.
    async fn mark_suspicious_by_ip(&self, ip: &str, now: u64) -> StoreResult<usize>;

    async fn has_vote(&self, fingerprint: &str, contestant: &str) -> StoreResult<bool>;

    async fn count_votes_by_ip(&self, ip: &str) -> StoreResult<u64>;

    /// Votes from `fingerprint` created strictly after `since`.
    async fn count_votes_since(&self, fingerprint: &str, since: u64) -> StoreResult<u64>;

    /// Insert the vote and bump `votes_used` atomically.
    async fn commit_vote(&self, vote: NewVote, max_votes: u32) -> StoreResult<CommitOutcome>;

    async fn append_rate_limit_log(
        &self,
        ip: &str,
        fingerprint: Option<&str>,
        endpoint: &str,
        now: u64,
    ) -> StoreResult<()>;

    async fn append_ip_change_log(
        &self,
        fingerprint: &str,
        old_ip: Option<&str>,
        new_ip: &str,
        now: u64,
    ) -> StoreResult<()>;

    async fn stats(&self) -> StoreResult<VoteStats>;

    /// Persist buffered state, if the store buffers anything.
    async fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}
