//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Token request / vote submission:
//!     → fingerprint.rs (derive device identity, mint tokens)
//!     → rate_limit.rs (fixed-window check per scope + IP)
//!         → counters.rs (atomic increment-with-TTL)
//! ```
//!
//! # Design Decisions
//! - Fingerprints are best-effort identity, not proof of a device
//! - Rate limiting fails open; verification (see `verification`) fails closed
//! - Counter increments are a single atomic store primitive

pub mod counters;
pub mod fingerprint;
pub mod rate_limit;

pub use counters::{CounterState, CounterStore, CounterStoreError, MemoryCounterStore};
pub use fingerprint::{compute_fingerprint, generate_token, normalize_contestant};
pub use rate_limit::{rate_limit_key, RateDecision, RateLimiter};
