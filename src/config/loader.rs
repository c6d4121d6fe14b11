//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::VotingConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
///
/// Environment overrides are applied after parsing and before validation.
pub fn load_config(path: &Path) -> Result<VotingConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: VotingConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a configuration from defaults plus environment overrides.
pub fn load_from_env() -> Result<VotingConfig, ConfigError> {
    let mut config = VotingConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay deployment values and secrets that should not live in the file.
pub fn apply_env_overrides<F>(config: &mut VotingConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("VOTE_BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = lookup("RECAPTCHA_SITE_KEY") {
        config.verification.site_key = v;
    }
    if let Some(v) = lookup("RECAPTCHA_SECRET_KEY") {
        config.verification.secret_key = v;
    }
    if let Some(v) = lookup("ALLOWED_CONTESTANTS") {
        config.contest.allowed_contestants = v;
    }
    if let Some(v) = lookup("ALLOWED_ORIGINS") {
        config.cors.allowed_origins = v;
    }
}
