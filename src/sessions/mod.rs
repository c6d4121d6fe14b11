//! Device sessions: token issuance, refresh and suspicion escalation.

pub mod registry;

pub use registry::{EscalationReason, IssuedSession, SessionRegistry};
