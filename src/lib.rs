//! Vote-integrity service library.

// Core subsystems
pub mod config;
pub mod http;
pub mod pipeline;

// Voting domain
pub mod ledger;
pub mod sessions;
pub mod store;
pub mod verification;

// Cross-cutting concerns
pub mod audit;
pub mod clock;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::VotingConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::VoteIntegrityPipeline;
