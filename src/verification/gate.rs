//! Pass/fail wrapper around the verification service.
//!
//! Transport errors, timeouts, malformed responses and explicit failures
//! all yield `false` (fail closed). This is the opposite policy from the
//! rate limiter.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::observability::metrics;
use crate::verification::{VerificationError, VerificationService};

/// Step-up verification gate.
#[derive(Clone)]
pub struct VerificationGate {
    service: Arc<dyn VerificationService>,
    site_key: String,
    deadline: Duration,
}

impl VerificationGate {
    pub fn new(service: Arc<dyn VerificationService>, site_key: String, deadline: Duration) -> Self {
        Self {
            service,
            site_key,
            deadline,
        }
    }

    /// Public key the client needs to render the challenge widget.
    pub fn site_key(&self) -> Result<&str, VerificationError> {
        if self.site_key.is_empty() {
            return Err(VerificationError::NotConfigured("verification.site_key"));
        }
        Ok(&self.site_key)
    }

    pub async fn verify(&self, proof_token: &str, client_ip: &str) -> bool {
        let result = match timeout(self.deadline, self.service.verify(proof_token, client_ip)).await {
            Ok(result) => result,
            Err(_) => Err(VerificationError::Timeout(self.deadline.as_secs())),
        };

        match result {
            Ok(passed) => {
                metrics::record_verification(if passed { "passed" } else { "rejected" });
                passed
            }
            Err(e) => {
                tracing::error!(client_ip = %client_ip, error = %e, "Verification failed closed");
                metrics::record_verification("error");
                false
            }
        }
    }
}
