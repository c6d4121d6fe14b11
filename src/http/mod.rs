//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware layers)
//!     → request.rs (request ID, client IP resolution)
//!     → handlers.rs (decode, call the pipeline)
//!     → response.rs (map typed outcomes to status + JSON)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{client_ip, MakeRequestUuid, X_REQUEST_ID, X_VOTE_TOKEN};
pub use response::{ErrorBody, VoteResponse};
pub use server::{AppState, HttpServer};
