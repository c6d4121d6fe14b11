//! Persisted record types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Server-side state for one device fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub fingerprint: String,
    pub token: String,
    /// Expiry timestamp (seconds since epoch). The token is valid up to and
    /// including this instant.
    pub token_expires_at: u64,
    pub votes_used: u32,
    pub ip_address: Option<String>,
    pub created_at: u64,
    pub updated_at: u64,
    is_suspicious: bool,
}

impl Session {
    pub fn new(fingerprint: String, token: String, token_expires_at: u64, ip: String, now: u64) -> Self {
        Self {
            fingerprint,
            token,
            token_expires_at,
            votes_used: 0,
            ip_address: Some(ip),
            created_at: now,
            updated_at: now,
            is_suspicious: false,
        }
    }

    pub fn is_suspicious(&self) -> bool {
        self.is_suspicious
    }

    /// One-way transition to suspicious. Returns true if the flag changed.
    ///
    /// There is deliberately no inverse.
    pub fn escalate(&mut self) -> bool {
        let changed = !self.is_suspicious;
        self.is_suspicious = true;
        changed
    }

    /// Whether the token is still usable at `now`.
    pub fn token_valid_at(&self, now: u64) -> bool {
        now <= self.token_expires_at
    }

    /// True when `ip` differs from a previously observed address.
    pub fn ip_differs(&self, ip: &str) -> bool {
        matches!(&self.ip_address, Some(stored) if stored != ip)
    }
}

/// One accepted ballot. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: u64,
    pub fingerprint: String,
    pub contestant: String,
    pub ip_address: Option<String>,
    pub created_at: u64,
    pub verified_via_captcha: bool,
    pub verified_via_sms: bool,
}

/// A vote about to be committed; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVote {
    pub fingerprint: String,
    pub contestant: String,
    pub ip_address: String,
    pub created_at: u64,
    pub verified_via_captcha: bool,
    pub verified_via_sms: bool,
}

/// Outcome of the atomic duplicate-check + cap-check + insert + increment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { vote_id: u64, votes_used: u32 },
    Duplicate,
    CapReached { votes_used: u32 },
    NoSession,
}

/// Result of refreshing a session's credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRefresh {
    pub session: Session,
    pub created: bool,
    /// Set when the stored IP differed from the refreshing client's IP.
    pub previous_ip: Option<String>,
    /// The IP change flipped the session to suspicious in this transaction.
    pub newly_suspicious: bool,
}

/// Audit row for a rejected rate-limited request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitLog {
    pub id: u64,
    pub ip_address: String,
    pub fingerprint: Option<String>,
    pub endpoint: String,
    pub created_at: u64,
}

/// Audit row for an observed IP change on a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpChangeLog {
    pub id: u64,
    pub fingerprint: String,
    pub old_ip: Option<String>,
    pub new_ip: String,
    pub created_at: u64,
}

/// Aggregate counts for the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStats {
    pub total_votes: u64,
    pub total_sessions: u64,
    pub suspicious_sessions: u64,
    pub votes_by_contestant: BTreeMap<String, u64>,
}
