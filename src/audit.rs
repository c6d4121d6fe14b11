//! Best-effort audit trail.
//!
//! Audit writes never fail the decision that triggered them; errors are
//! logged and dropped.

use std::sync::Arc;

use crate::store::RecordStore;

#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn RecordStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    pub async fn ip_changed(&self, fingerprint: &str, old_ip: Option<&str>, new_ip: &str, now: u64) {
        if let Err(e) = self
            .store
            .append_ip_change_log(fingerprint, old_ip, new_ip, now)
            .await
        {
            tracing::warn!(fingerprint = %fingerprint, error = %e, "Dropped IP change audit entry");
        }
    }

    pub async fn rate_limited(&self, ip: &str, fingerprint: Option<&str>, endpoint: &str, now: u64) {
        if let Err(e) = self
            .store
            .append_rate_limit_log(ip, fingerprint, endpoint, now)
            .await
        {
            tracing::warn!(ip = %ip, endpoint = %endpoint, error = %e, "Dropped rate limit audit entry");
        }
    }
}
