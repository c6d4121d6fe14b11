//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the voting
//! service. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the voting service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VotingConfig {
    /// Listener configuration (bind address, client IP resolution).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Vote limits, token lifetime and rate limits.
    pub security: SecurityConfig,

    /// Contest definition.
    pub contest: ContestConfig,

    /// Cross-origin settings for the browser client.
    pub cors: CorsConfig,

    /// Human-verification provider settings.
    pub verification: VerificationConfig,

    /// Record store persistence.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Take the client IP from the first `X-Forwarded-For` entry when present.
    pub trust_forwarded_for: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            trust_forwarded_for: true,
        }
    }
}

/// Timeout configuration for the request path and external collaborators.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Deadline for a single counter store operation in milliseconds.
    pub counter_store_ms: u64,

    /// Deadline for a verification service round trip in seconds.
    pub verification_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            counter_store_ms: 250,
            verification_secs: 5,
        }
    }
}

/// Vote limits and token policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Lifetime of an issued voting token.
    pub token_expiry_minutes: u64,

    /// Maximum accepted votes per device fingerprint.
    pub max_votes_per_device: u32,

    /// Maximum accepted votes per client IP across all fingerprints.
    pub max_votes_per_ip: u64,

    /// Declared limit on IP changes per session. Not enforced.
    pub max_ip_changes_allowed: u32,

    /// Votes accepted per client IP per minute before step-up is demanded.
    pub rate_limit_votes_per_minute: u64,

    /// Token requests per client IP per minute.
    pub token_requests_per_minute: u64,

    /// Trailing window used for burst detection, in seconds.
    pub burst_window_secs: u64,

    /// Votes inside the burst window that flag a session.
    pub burst_threshold: u64,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_expiry_minutes: 30,
            max_votes_per_device: 3,
            max_votes_per_ip: 10,
            max_ip_changes_allowed: 3,
            rate_limit_votes_per_minute: 5,
            token_requests_per_minute: 10,
            burst_window_secs: 60,
            burst_threshold: 2,
            max_body_size: 64 * 1024,
        }
    }
}

/// Contest definition.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ContestConfig {
    /// Comma-separated, case-insensitive list of contestants.
    pub allowed_contestants: String,
}

impl ContestConfig {
    /// Normalized allow-list (trimmed, lowercased, empty entries dropped).
    pub fn allowed_list(&self) -> Vec<String> {
        split_list(&self.allowed_contestants)
            .map(|name| name.to_lowercase())
            .collect()
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Comma-separated origins. `*` allows any origin; empty disables CORS.
    pub allowed_origins: String,
}

impl CorsConfig {
    pub fn origins(&self) -> Vec<String> {
        split_list(&self.allowed_origins).map(str::to_string).collect()
    }
}

/// Human-verification provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Public key rendered by the client widget.
    pub site_key: String,

    /// Server-side secret sent to the provider.
    pub secret_key: String,

    /// Provider verification endpoint.
    pub verify_url: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            site_key: String::new(),
            secret_key: String::new(),
            verify_url: "https://www.google.com/recaptcha/api/siteverify".to_string(),
        }
    }
}

/// Record store persistence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot file. `None` keeps records in memory only.
    pub snapshot_path: Option<String>,

    /// Interval between background snapshot flushes and counter purges.
    pub flush_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            flush_interval_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}
