//! Endpoint handlers.

use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use std::net::SocketAddr;

use crate::http::request::{client_ip, X_VOTE_TOKEN};
use crate::http::response::{ErrorBody, VoteResponse};
use crate::http::server::AppState;
use crate::pipeline::{AuthFailure, VoteRejection, VoteSubmission};

#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    #[serde(rename = "visitorId")]
    pub visitor_id: String,
    #[serde(rename = "localId", default)]
    pub local_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub contestant: String,
    pub fingerprint: String,
    /// Required only once the session is suspicious.
    #[serde(default)]
    pub recaptcha_token: Option<String>,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "vote-guard",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn issue_token(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Response {
    let ip = client_ip(&headers, peer, state.trust_forwarded_for);
    match state
        .pipeline
        .issue_token(&query.visitor_id, &query.local_id, &ip)
        .await
    {
        Ok(issued) => Json(issued).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

pub async fn submit_vote(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<VoteRequest>,
) -> Response {
    let ip = client_ip(&headers, peer, state.trust_forwarded_for);
    let Some(token) = headers.get(X_VOTE_TOKEN).and_then(|v| v.to_str().ok()) else {
        tracing::debug!(client_ip = %ip, "Vote without X-Vote-Token header");
        return VoteRejection::Unauthenticated(AuthFailure::TokenMismatch).into_response();
    };

    let submission = VoteSubmission {
        fingerprint: request.fingerprint,
        contestant: request.contestant,
        proof_token: request.recaptcha_token,
        presented_token: token.to_string(),
        client_ip: ip,
    };

    match state.pipeline.submit_vote(submission).await {
        Ok(accepted) => Json(VoteResponse::from(&accepted)).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

pub async fn verification_site_key(State(state): State<AppState>) -> Response {
    match state.pipeline.verification_site_key() {
        Ok(key) => Json(serde_json::json!({ "site_key": key })).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(e.to_string()))).into_response(),
    }
}

pub async fn stats(State(state): State<AppState>) -> Response {
    match state.pipeline.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read stats");
            (StatusCode::SERVICE_UNAVAILABLE, Json(ErrorBody::new("Stats are temporarily unavailable."))).into_response()
        }
    }
}
