//! Human-verification subsystem.
//!
//! # Data Flow
//! ```text
//! suspicious vote + proof token
//!     → gate.rs (deadline, fail-closed policy)
//!     → recaptcha.rs (provider round trip)
//! ```

pub mod gate;
pub mod recaptcha;

use async_trait::async_trait;
use thiserror::Error;

pub use gate::VerificationGate;
pub use recaptcha::RecaptchaVerifier;

/// Errors raised while talking to a verification provider.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("verification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("verification timed out after {0} seconds")]
    Timeout(u64),

    #[error("malformed verification response: {0}")]
    Malformed(String),
}

/// Remote oracle deciding whether a proof token came from a human.
#[async_trait]
pub trait VerificationService: Send + Sync {
    async fn verify(&self, proof_token: &str, remote_ip: &str) -> Result<bool, VerificationError>;
}
