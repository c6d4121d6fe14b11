//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Build collaborators → Assemble pipeline
//!
//! Maintenance (maintenance.rs):
//!     Every flush interval → flush record store, purge expired counters
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Final flush → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then stores, then listeners
//! - Fail fast: any startup error is fatal

pub mod maintenance;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use maintenance::MaintenanceTask;
pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{build_runtime, Runtime, StartupError};
