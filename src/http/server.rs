//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (timeout, body limit, request ID, tracing, CORS)
//! - Bind server to listener and shut down on signal

use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{CorsConfig, VotingConfig};
use crate::http::handlers;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID, X_VOTE_TOKEN};
use crate::pipeline::VoteIntegrityPipeline;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<VoteIntegrityPipeline>,
    pub trust_forwarded_for: bool,
}

/// HTTP server for the voting API.
pub struct HttpServer {
    router: Router,
    config: VotingConfig,
}

impl HttpServer {
    /// Create a new HTTP server around an assembled pipeline.
    pub fn new(config: VotingConfig, pipeline: Arc<VoteIntegrityPipeline>) -> Self {
        let state = AppState {
            pipeline,
            trust_forwarded_for: config.listener.trust_forwarded_for,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &VotingConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/", get(handlers::health))
            .route("/token", get(handlers::issue_token))
            .route("/vote", post(handlers::submit_vote))
            .route("/captcha/site-key", get(handlers::verification_site_key))
            .route("/stats", get(handlers::stats))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid));

        match cors_layer(&config.cors) {
            Some(cors) => router.layer(cors),
            None => router,
        }
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            contestants = self.config.contest.allowed_list().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &VotingConfig {
        &self.config
    }

    /// The router without a listener, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

fn cors_layer(config: &CorsConfig) -> Option<CorsLayer> {
    let origins = config.origins();
    if origins.is_empty() {
        return None;
    }

    if origins.iter().any(|o| o == "*") {
        return Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                axum::http::header::CONTENT_TYPE,
                X_VOTE_TOKEN,
                HeaderName::from_static("x-request-id"),
            ])
            .allow_credentials(true),
    )
}
