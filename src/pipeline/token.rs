//! IssueToken.

use crate::observability::metrics;
use crate::pipeline::{IssuedToken, TokenRejection, VoteIntegrityPipeline, RATE_WINDOW_SECS};
use crate::security::{compute_fingerprint, rate_limit_key};

impl VoteIntegrityPipeline {
    /// Issue a short-lived token bound to the device fingerprint.
    pub async fn issue_token(
        &self,
        visitor_id: &str,
        local_id: &str,
        client_ip: &str,
    ) -> Result<IssuedToken, TokenRejection> {
        let decision = self
            .limiter
            .check(
                &rate_limit_key("token", client_ip),
                self.settings.token_requests_per_minute,
                RATE_WINDOW_SECS,
            )
            .await;
        if !decision.allowed {
            tracing::warn!(client_ip = %client_ip, count = decision.count, "Token rate limit exceeded");
            metrics::record_rate_limited("token");
            self.audit
                .rate_limited(client_ip, None, "token", self.clock.now_secs())
                .await;
            return Err(TokenRejection::RateLimited);
        }

        if visitor_id.trim().is_empty() {
            return Err(TokenRejection::InvalidVisitor);
        }

        let fingerprint = compute_fingerprint(visitor_id, local_id);
        let issued = self.sessions.issue_or_refresh(&fingerprint, client_ip).await?;
        let votes_used_from_ip = self.ledger.count_votes_from_ip(client_ip).await?;

        let session = issued.session;
        Ok(IssuedToken {
            token: session.token.clone(),
            fingerprint,
            expires_at: session.token_expires_at,
            votes_used: session.votes_used,
            votes_used_from_ip,
            is_suspicious: session.is_suspicious(),
        })
    }
}
