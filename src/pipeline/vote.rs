//! SubmitVote.

use crate::ledger::VerificationFlags;
use crate::observability::metrics;
use crate::pipeline::{
    AuthFailure, VoteAccepted, VoteIntegrityPipeline, VoteRejection, VoteSubmission,
    RATE_WINDOW_SECS,
};
use crate::security::{normalize_contestant, rate_limit_key};
use crate::sessions::EscalationReason;
use crate::store::CommitOutcome;

impl VoteIntegrityPipeline {
    /// Validate and record a vote.
    pub async fn submit_vote(&self, submission: VoteSubmission) -> Result<VoteAccepted, VoteRejection> {
        let result = self.run_checks(&submission).await;
        match &result {
            Ok(accepted) => {
                tracing::info!(
                    fingerprint = %submission.fingerprint,
                    contestant = %accepted.contestant,
                    votes_remaining = accepted.votes_remaining,
                    "Vote recorded"
                );
                metrics::record_vote_outcome("accepted");
            }
            Err(rejection) => {
                tracing::info!(
                    fingerprint = %submission.fingerprint,
                    client_ip = %submission.client_ip,
                    reason = rejection.kind(),
                    "Vote rejected"
                );
                metrics::record_vote_outcome(rejection.kind());
            }
        }
        result
    }

    async fn run_checks(&self, s: &VoteSubmission) -> Result<VoteAccepted, VoteRejection> {
        let max_per_device = self.settings.max_votes_per_device;

        let mut session = self
            .sessions
            .get(&s.fingerprint)
            .await?
            .ok_or(VoteRejection::Unauthenticated(AuthFailure::NoSession))?;

        if session.token != s.presented_token {
            return Err(VoteRejection::Unauthenticated(AuthFailure::TokenMismatch));
        }
        if !session.token_valid_at(self.clock.now_secs()) {
            return Err(VoteRejection::Unauthenticated(AuthFailure::Expired));
        }

        // Persisted before any later check can reject.
        if session.ip_differs(&s.client_ip) {
            self.sessions.mark_ip_changed(&mut session, &s.client_ip).await?;
        }

        if session.is_suspicious() {
            // Only an absent or empty proof counts as missing; anything else
            // goes to the verification service.
            let proof = s
                .proof_token
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or(VoteRejection::VerificationRequired)?;
            if !self.gate.verify(proof, &s.client_ip).await {
                return Err(VoteRejection::VerificationFailed);
            }
        }

        let contestant = normalize_contestant(&s.contestant);
        if !self.settings.allowed_contestants.contains(&contestant) {
            return Err(VoteRejection::InvalidContestant {
                allowed: self.settings.allowed_contestants.clone(),
            });
        }

        if self.ledger.has_voted(&s.fingerprint, &contestant).await? {
            return Err(VoteRejection::DuplicateVote { contestant });
        }

        if session.votes_used >= max_per_device {
            return Err(VoteRejection::DeviceCapReached { max: max_per_device });
        }

        let from_ip = self.ledger.count_votes_from_ip(&s.client_ip).await?;
        if from_ip >= self.settings.max_votes_per_ip {
            if let Err(e) = self.ledger.mark_all_sessions_from_ip_suspicious(&s.client_ip).await {
                tracing::error!(client_ip = %s.client_ip, error = %e, "Failed to flag sessions at IP cap");
            }
            return Err(VoteRejection::IpCapReached {
                max: self.settings.max_votes_per_ip,
            });
        }

        let decision = self
            .limiter
            .check(
                &rate_limit_key("vote", &s.client_ip),
                self.settings.votes_per_minute,
                RATE_WINDOW_SECS,
            )
            .await;
        if !decision.allowed {
            metrics::record_rate_limited("vote");
            if let Err(e) = self.sessions.escalate(&mut session, EscalationReason::RateLimited).await {
                tracing::error!(fingerprint = %s.fingerprint, error = %e, "Failed to flag rate-limited session");
            }
            self.audit
                .rate_limited(&s.client_ip, Some(&s.fingerprint), "vote", self.clock.now_secs())
                .await;
            return Err(VoteRejection::RequiresVerification);
        }

        // Flags future submissions only; this vote still goes through.
        let recent = self
            .ledger
            .count_recent_votes(&s.fingerprint, self.settings.burst_window_secs)
            .await?;
        if recent >= self.settings.burst_threshold {
            self.sessions.escalate(&mut session, EscalationReason::BurstDetected).await?;
        }

        // Read after the burst check so a vote escalated above is flagged too.
        let elevated = session.is_suspicious();
        let flags = VerificationFlags {
            captcha: elevated,
            sms: false,
        };
        match self
            .ledger
            .record(&s.fingerprint, &contestant, &s.client_ip, flags, max_per_device)
            .await?
        {
            CommitOutcome::Committed { vote_id, votes_used } => Ok(VoteAccepted {
                vote_id,
                contestant,
                votes_remaining: max_per_device.saturating_sub(votes_used),
                verified_via_captcha: elevated,
            }),
            CommitOutcome::Duplicate => Err(VoteRejection::DuplicateVote { contestant }),
            CommitOutcome::CapReached { .. } => Err(VoteRejection::DeviceCapReached { max: max_per_device }),
            CommitOutcome::NoSession => Err(VoteRejection::Unauthenticated(AuthFailure::NoSession)),
        }
    }
}
