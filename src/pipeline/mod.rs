//! Vote-integrity pipeline.
//!
//! # Data Flow
//! ```text
//! IssueToken:
//!     rate limit (token:{ip}) → fingerprint → SessionRegistry::issue_or_refresh
//!
//! SubmitVote (first failure wins):
//!     1 session exists → 2 token matches → 3 token fresh
//!     → 4 IP change escalation → 5 step-up verification if suspicious
//!     → 6 contestant allow-list → 7 duplicate → 8 device cap → 9 IP cap
//!     → 10 rate limit (soft) → 11 burst escalation → 12 commit
//! ```
//!
//! # Design Decisions
//! - Collaborators are injected; nothing here is global
//! - Rate limiting fails open, verification fails closed
//! - The commit re-checks duplicate and cap atomically in the store

pub mod outcome;
mod token;
mod vote;

use std::sync::Arc;
use std::time::Duration;

use crate::clock::SharedClock;
use crate::config::VotingConfig;
use crate::ledger::VoteLedger;
use crate::security::{CounterStore, RateLimiter};
use crate::sessions::SessionRegistry;
use crate::store::{RecordStore, StoreResult, VoteStats};
use crate::verification::{VerificationError, VerificationGate, VerificationService};
use crate::audit::AuditTrail;

pub use outcome::{
    AuthFailure, IssuedToken, TokenRejection, VoteAccepted, VoteRejection, VoteSubmission,
};

/// Window for both the token and the vote rate limits.
const RATE_WINDOW_SECS: u64 = 60;

/// Limits the pipeline enforces, extracted from [`VotingConfig`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_votes_per_device: u32,
    pub max_votes_per_ip: u64,
    pub votes_per_minute: u64,
    pub token_requests_per_minute: u64,
    pub burst_window_secs: u64,
    pub burst_threshold: u64,
    pub allowed_contestants: Vec<String>,
}

impl From<&VotingConfig> for PipelineSettings {
    fn from(config: &VotingConfig) -> Self {
        let security = &config.security;
        Self {
            max_votes_per_device: security.max_votes_per_device,
            max_votes_per_ip: security.max_votes_per_ip,
            votes_per_minute: security.rate_limit_votes_per_minute,
            token_requests_per_minute: security.token_requests_per_minute,
            burst_window_secs: security.burst_window_secs,
            burst_threshold: security.burst_threshold,
            allowed_contestants: config.contest.allowed_list(),
        }
    }
}

/// External collaborators the pipeline runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn RecordStore>,
    pub counters: Arc<dyn CounterStore>,
    pub verifier: Arc<dyn VerificationService>,
    pub clock: SharedClock,
}

pub struct VoteIntegrityPipeline {
    sessions: SessionRegistry,
    ledger: VoteLedger,
    limiter: RateLimiter,
    gate: VerificationGate,
    audit: AuditTrail,
    clock: SharedClock,
    settings: PipelineSettings,
}

impl VoteIntegrityPipeline {
    pub fn new(config: &VotingConfig, deps: Collaborators) -> Self {
        let token_ttl_secs = config.security.token_expiry_minutes.saturating_mul(60);
        Self {
            sessions: SessionRegistry::new(deps.store.clone(), deps.clock.clone(), token_ttl_secs),
            ledger: VoteLedger::new(deps.store.clone(), deps.clock.clone()),
            limiter: RateLimiter::new(
                deps.counters,
                Duration::from_millis(config.timeouts.counter_store_ms),
            ),
            gate: VerificationGate::new(
                deps.verifier,
                config.verification.site_key.clone(),
                Duration::from_secs(config.timeouts.verification_secs),
            ),
            audit: AuditTrail::new(deps.store),
            clock: deps.clock,
            settings: PipelineSettings::from(config),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn ledger(&self) -> &VoteLedger {
        &self.ledger
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Public key for the client's challenge widget.
    pub fn verification_site_key(&self) -> Result<&str, VerificationError> {
        self.gate.site_key()
    }

    pub async fn stats(&self) -> StoreResult<VoteStats> {
        self.ledger.stats().await
    }
}
