//! Startup orchestration.
//!
//! Builds the production collaborators from a validated [`VotingConfig`]
//! and assembles the pipeline. Any failure here is fatal.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::clock::{SharedClock, SystemClock};
use crate::config::VotingConfig;
use crate::pipeline::{Collaborators, VoteIntegrityPipeline};
use crate::security::{CounterStore, MemoryCounterStore};
use crate::store::{MemoryStore, RecordStore, StoreError};
use crate::verification::{RecaptchaVerifier, VerificationError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open record store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to build verification client: {0}")]
    Verification(#[from] VerificationError),
}

/// Everything the server binary needs after startup.
pub struct Runtime {
    pub pipeline: Arc<VoteIntegrityPipeline>,
    pub store: Arc<dyn RecordStore>,
    pub counters: Arc<dyn CounterStore>,
}

pub fn build_runtime(config: &VotingConfig) -> Result<Runtime, StartupError> {
    let clock: SharedClock = Arc::new(SystemClock);

    let store: Arc<dyn RecordStore> = match &config.storage.snapshot_path {
        Some(path) => Arc::new(MemoryStore::load_from_file(&PathBuf::from(path))?),
        None => {
            tracing::warn!("No snapshot_path configured, records are kept in memory only");
            Arc::new(MemoryStore::new(None))
        }
    };
    let counters: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new(clock.clone()));

    let verifier = RecaptchaVerifier::new(
        &config.verification,
        Duration::from_secs(config.timeouts.verification_secs),
    )?;
    if config.verification.secret_key.is_empty() {
        tracing::warn!("RECAPTCHA_SECRET_KEY is not set, suspicious sessions cannot vote");
    }

    let pipeline = VoteIntegrityPipeline::new(
        config,
        Collaborators {
            store: store.clone(),
            counters: counters.clone(),
            verifier: Arc::new(verifier),
            clock,
        },
    );

    Ok(Runtime {
        pipeline: Arc::new(pipeline),
        store,
        counters,
    })
}
