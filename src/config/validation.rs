//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (caps > 0, TTLs > 0, address parses)
//! - Reject an empty contestant allow-list
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: VotingConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::VotingConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("contest.allowed_contestants lists no contestants")]
    NoContestants,

    #[error("observability.log_format must be 'pretty' or 'json', got '{0}'")]
    LogFormat(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &VotingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let security = &config.security;
    let positive: [(&'static str, u64); 8] = [
        ("security.token_expiry_minutes", security.token_expiry_minutes),
        ("security.max_votes_per_device", u64::from(security.max_votes_per_device)),
        ("security.max_votes_per_ip", security.max_votes_per_ip),
        ("security.rate_limit_votes_per_minute", security.rate_limit_votes_per_minute),
        ("security.token_requests_per_minute", security.token_requests_per_minute),
        ("security.burst_window_secs", security.burst_window_secs),
        ("timeouts.counter_store_ms", config.timeouts.counter_store_ms),
        ("timeouts.verification_secs", config.timeouts.verification_secs),
    ];
    for (name, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(name));
        }
    }
    if security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    if config.contest.allowed_list().is_empty() {
        errors.push(ValidationError::NoContestants);
    }

    let observability = &config.observability;
    if !matches!(observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::LogFormat(observability.log_format.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
