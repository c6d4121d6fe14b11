//! Typed results of the token and vote operations.

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// A vote submission as received from the client.
#[derive(Debug, Clone)]
pub struct VoteSubmission {
    pub fingerprint: String,
    pub contestant: String,
    pub proof_token: Option<String>,
    pub presented_token: String,
    pub client_ip: String,
}

/// A recorded vote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteAccepted {
    pub vote_id: u64,
    pub contestant: String,
    pub votes_remaining: u32,
    pub verified_via_captcha: bool,
}

impl VoteAccepted {
    pub fn message(&self) -> String {
        format!("Vote recorded for {}!", capitalize(&self.contestant))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("Invalid session. Please refresh your token.")]
    NoSession,
    #[error("Invalid token. Please refresh your token.")]
    TokenMismatch,
    #[error("Token expired. Please refresh your token.")]
    Expired,
}

/// Why a vote was not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteRejection {
    #[error("{0}")]
    Unauthenticated(AuthFailure),

    #[error("CAPTCHA verification required. Please complete the reCAPTCHA challenge.")]
    VerificationRequired,

    #[error("Invalid CAPTCHA response. Please try again.")]
    VerificationFailed,

    #[error("Invalid contestant name. Allowed contestants: {}", .allowed.join(", "))]
    InvalidContestant { allowed: Vec<String> },

    #[error("You have already voted for {}.", capitalize(.contestant))]
    DuplicateVote { contestant: String },

    #[error("Maximum votes ({max}) reached for this device.")]
    DeviceCapReached { max: u32 },

    #[error("Maximum votes ({max}) reached from your location. You cannot vote from multiple browsers.")]
    IpCapReached { max: u64 },

    /// Rate limited: the session is now flagged and the client should retry
    /// with a proof token.
    #[error("Suspicious activity detected. Additional verification required.")]
    RequiresVerification,

    #[error("Voting is temporarily unavailable. Please try again.")]
    StoreUnavailable,
}

impl VoteRejection {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            VoteRejection::Unauthenticated(_) => "unauthenticated",
            VoteRejection::VerificationRequired => "verification_required",
            VoteRejection::VerificationFailed => "verification_failed",
            VoteRejection::InvalidContestant { .. } => "invalid_contestant",
            VoteRejection::DuplicateVote { .. } => "duplicate_vote",
            VoteRejection::DeviceCapReached { .. } => "device_cap_reached",
            VoteRejection::IpCapReached { .. } => "ip_cap_reached",
            VoteRejection::RequiresVerification => "requires_verification",
            VoteRejection::StoreUnavailable => "store_unavailable",
        }
    }

    /// The client should render a challenge and resubmit with its proof.
    pub fn requires_captcha(&self) -> bool {
        matches!(
            self,
            VoteRejection::VerificationRequired | VoteRejection::VerificationFailed
        )
    }

    /// Recoverable rejection caused by rate limiting.
    pub fn requires_verification(&self) -> bool {
        matches!(self, VoteRejection::RequiresVerification)
    }
}

impl From<StoreError> for VoteRejection {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "Record store failure during vote");
        VoteRejection::StoreUnavailable
    }
}

/// Token response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub fingerprint: String,
    /// Seconds since epoch.
    pub expires_at: u64,
    pub votes_used: u32,
    pub votes_used_from_ip: u64,
    pub is_suspicious: bool,
}

/// Why a token was not issued.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenRejection {
    #[error("Too many token requests. Please try again later.")]
    RateLimited,

    #[error("visitorId must not be empty.")]
    InvalidVisitor,

    #[error("Token service is temporarily unavailable. Please try again.")]
    StoreUnavailable,
}

impl From<StoreError> for TokenRejection {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "Record store failure during token issuance");
        TokenRejection::StoreUnavailable
    }
}

/// Uppercase the first character, as shown back to voters.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
