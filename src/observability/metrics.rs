//! Metrics collection and exposition.
//!
//! # Metrics
//! - `vote_outcomes_total` (counter): vote submissions by outcome
//! - `tokens_issued_total` (counter): token issuance, new vs refreshed session
//! - `session_escalations_total` (counter): suspicion transitions by reason
//! - `rate_limited_total` (counter): rejections by scope
//! - `counter_store_fail_open_total` (counter): rate checks allowed on store failure
//! - `verification_results_total` (counter): step-up results

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_vote_outcome(outcome: &'static str) {
    counter!("vote_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_token_issued(new_session: bool) {
    let kind = if new_session { "new" } else { "refresh" };
    counter!("tokens_issued_total", "session" => kind).increment(1);
}

pub fn record_escalation(reason: &'static str) {
    record_escalations(reason, 1);
}

pub fn record_escalations(reason: &'static str, sessions: u64) {
    counter!("session_escalations_total", "reason" => reason).increment(sessions);
}

pub fn record_rate_limited(scope: &'static str) {
    counter!("rate_limited_total", "scope" => scope).increment(1);
}

pub fn record_counter_fail_open() {
    counter!("counter_store_fail_open_total").increment(1);
}

pub fn record_verification(result: &'static str) {
    counter!("verification_results_total", "result" => result).increment(1);
}
