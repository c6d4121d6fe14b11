//! Mapping of pipeline outcomes onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::pipeline::{TokenRejection, VoteAccepted, VoteRejection};

/// Body returned by `POST /vote`, for successes and rejections alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
    pub votes_remaining: Option<u32>,
    #[serde(default)]
    pub requires_verification: bool,
    #[serde(default)]
    pub requires_captcha: bool,
}

impl From<&VoteAccepted> for VoteResponse {
    fn from(accepted: &VoteAccepted) -> Self {
        Self {
            success: true,
            message: accepted.message(),
            votes_remaining: Some(accepted.votes_remaining),
            requires_verification: false,
            requires_captcha: false,
        }
    }
}

impl From<&VoteRejection> for VoteResponse {
    fn from(rejection: &VoteRejection) -> Self {
        Self {
            success: false,
            message: rejection.to_string(),
            votes_remaining: None,
            requires_verification: rejection.requires_verification(),
            requires_captcha: rejection.requires_captcha(),
        }
    }
}

/// Generic error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

pub fn vote_rejection_status(rejection: &VoteRejection) -> StatusCode {
    match rejection {
        VoteRejection::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        VoteRejection::VerificationRequired | VoteRejection::VerificationFailed => {
            StatusCode::FORBIDDEN
        }
        VoteRejection::InvalidContestant { .. } | VoteRejection::DuplicateVote { .. } => {
            StatusCode::BAD_REQUEST
        }
        VoteRejection::DeviceCapReached { .. } | VoteRejection::IpCapReached { .. } => {
            StatusCode::FORBIDDEN
        }
        // Soft failure: the request was understood, the client must step up.
        VoteRejection::RequiresVerification => StatusCode::OK,
        VoteRejection::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for VoteRejection {
    fn into_response(self) -> Response {
        (vote_rejection_status(&self), Json(VoteResponse::from(&self))).into_response()
    }
}

impl IntoResponse for TokenRejection {
    fn into_response(self) -> Response {
        let status = match self {
            TokenRejection::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            TokenRejection::InvalidVisitor => StatusCode::BAD_REQUEST,
            TokenRejection::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
