use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;

use crate::domain::DomainError;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Cooldown { time_until_next_claim: i64 },
    Conflict { code: &'static str, message: String },
    InvalidCode(String),
    Validation(String),
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Cooldown { time_until_next_claim } => {
                write!(f, "Claim not available for another {}ms", time_until_next_claim)
            }
            ApiError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
            ApiError::InvalidCode(code) => write!(f, "Invalid referral code: {}", code),
            ApiError::Validation(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_until_next_claim: Option<i64>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut time_until_next_claim = None;
        let (status, error_type, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Cooldown { time_until_next_claim: remaining } => {
                time_until_next_claim = Some(remaining);
                (
                    StatusCode::BAD_REQUEST,
                    "invalid_state",
                    "Cannot claim yet".to_string(),
                )
            }
            ApiError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            ApiError::InvalidCode(code) => (
                StatusCode::NOT_FOUND,
                "invalid_code",
                format!("Invalid referral code: {}", code),
            ),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            time_until_next_claim,
        });

        (status, body).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound(msg) => ApiError::NotFound(msg),
            DomainError::InvalidState { time_until_next_claim } => {
                ApiError::Cooldown { time_until_next_claim }
            }
            DomainError::AlreadyCompleted(msg) => ApiError::Conflict {
                code: "already_completed",
                message: format!("Task already completed: {}", msg),
            },
            DomainError::AlreadyApplied(msg) => ApiError::Conflict {
                code: "already_applied",
                message: format!("Referral already applied: {}", msg),
            },
            DomainError::SelfReferral(_) => ApiError::Conflict {
                code: "self_referral",
                message: "Cannot refer yourself".to_string(),
            },
            DomainError::InvalidCode(code) => ApiError::InvalidCode(code),
            DomainError::Validation(msg) => ApiError::Validation(msg),
            DomainError::Storage(msg) => ApiError::Internal(msg),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
