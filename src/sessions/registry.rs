//! Fingerprint → session mapping.
//!
//! # Responsibilities
//! - Issue and refresh bearer tokens
//! - Detect IP changes on refresh and mid-session
//! - Own the one-way suspicion transition for single sessions
//!
//! # Design Decisions
//! - Every trigger site escalates through [`SessionRegistry::escalate`]
//! - On a mid-session IP change the session is flagged before the new IP is
//!   stored, so a failed write can never leave the new IP unflagged

use std::sync::Arc;

use crate::audit::AuditTrail;
use crate::clock::SharedClock;
use crate::observability::metrics;
use crate::security::generate_token;
use crate::store::{RecordStore, Session, StoreResult};

/// Why a session was flagged suspicious.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationReason {
    IpChanged,
    IpCapReached,
    RateLimited,
    BurstDetected,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::IpChanged => "ip_changed",
            EscalationReason::IpCapReached => "ip_cap_reached",
            EscalationReason::RateLimited => "rate_limited",
            EscalationReason::BurstDetected => "burst_detected",
        }
    }
}

/// A freshly issued or refreshed session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub session: Session,
    pub created: bool,
}

#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn RecordStore>,
    audit: AuditTrail,
    clock: SharedClock,
    token_ttl_secs: u64,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn RecordStore>, clock: SharedClock, token_ttl_secs: u64) -> Self {
        Self {
            audit: AuditTrail::new(store.clone()),
            store,
            clock,
            token_ttl_secs,
        }
    }

    /// Mint a new token for `fingerprint`, creating the session if needed.
    pub async fn issue_or_refresh(&self, fingerprint: &str, client_ip: &str) -> StoreResult<IssuedSession> {
        let now = self.clock.now_secs();
        let token = generate_token();
        let expires_at = now.saturating_add(self.token_ttl_secs);

        let refresh = self
            .store
            .refresh_session(fingerprint, &token, expires_at, client_ip, now)
            .await?;

        if let Some(old_ip) = refresh.previous_ip.as_deref() {
            self.audit.ip_changed(fingerprint, Some(old_ip), client_ip, now).await;
            if refresh.newly_suspicious {
                note_escalation(fingerprint, EscalationReason::IpChanged);
            }
        }

        metrics::record_token_issued(refresh.created);
        tracing::debug!(
            fingerprint = %fingerprint,
            created = refresh.created,
            expires_at,
            "Token issued"
        );

        Ok(IssuedSession {
            session: refresh.session,
            created: refresh.created,
        })
    }

    pub async fn get(&self, fingerprint: &str) -> StoreResult<Option<Session>> {
        self.store.get_session(fingerprint).await
    }

    /// Handle a vote arriving from a different IP than the session last saw.
    pub async fn mark_ip_changed(&self, session: &mut Session, new_ip: &str) -> StoreResult<()> {
        let now = self.clock.now_secs();
        let old_ip = session.ip_address.clone();
        self.audit
            .ip_changed(&session.fingerprint, old_ip.as_deref(), new_ip, now)
            .await;

        self.escalate(session, EscalationReason::IpChanged).await?;
        self.store
            .update_session_ip(&session.fingerprint, new_ip, now)
            .await?;
        session.ip_address = Some(new_ip.to_string());
        Ok(())
    }

    /// Flag the session suspicious, in the store and in the caller's copy.
    pub async fn escalate(&self, session: &mut Session, reason: EscalationReason) -> StoreResult<()> {
        let now = self.clock.now_secs();
        let newly = self.store.mark_suspicious(&session.fingerprint, now).await?;
        session.escalate();
        if newly {
            note_escalation(&session.fingerprint, reason);
        }
        Ok(())
    }
}

fn note_escalation(fingerprint: &str, reason: EscalationReason) {
    tracing::warn!(fingerprint = %fingerprint, reason = reason.as_str(), "Session escalated to suspicious");
    metrics::record_escalation(reason.as_str());
}
