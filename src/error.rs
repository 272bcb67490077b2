//! API error taxonomy and its mapping onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid password")]
    InvalidCredentials,

    #[error("Please verify your email before logging in.")]
    UnverifiedAccount,

    #[error("Missing authorization token")]
    MissingCredentials,

    #[error("Invalid or expired session")]
    InvalidSession,

    #[error("Access denied. Admins only.")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// A multi-step operation stopped after some writes were already applied.
    #[error("{failed} failed after {completed} succeeded")]
    PartialFailure {
        completed: &'static str,
        failed: &'static str,
        compensated: bool,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::DuplicateEmail
            | ApiError::InvalidToken
            | ApiError::InvalidOrExpiredToken
            | ApiError::UserNotFound
            | ApiError::InvalidCredentials => StatusCode::BAD_REQUEST,
            ApiError::MissingCredentials => StatusCode::UNAUTHORIZED,
            ApiError::UnverifiedAccount | ApiError::InvalidSession | ApiError::Forbidden => {
                StatusCode::FORBIDDEN
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PartialFailure { .. } | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "validation_error",
            ApiError::DuplicateEmail => "duplicate_email",
            ApiError::InvalidToken => "invalid_token",
            ApiError::InvalidOrExpiredToken => "invalid_or_expired_token",
            ApiError::UserNotFound => "user_not_found",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::UnverifiedAccount => "unverified_account",
            ApiError::MissingCredentials => "missing_credentials",
            ApiError::InvalidSession => "invalid_session",
            ApiError::Forbidden => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::PartialFailure { .. } => "partial_failure",
            ApiError::Storage(_) => "internal_error",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let body = match &self {
            ApiError::Storage(e) => {
                error!(error = ?e, "storage failure");
                json!({ "error": "Internal server error", "code": code })
            }
            ApiError::PartialFailure {
                completed,
                failed,
                compensated,
                source,
            } => {
                error!(error = ?source, completed, failed, compensated, "partial failure");
                json!({
                    "error": self.to_string(),
                    "code": code,
                    "completed": completed,
                    "failed": failed,
                    "compensated": compensated,
                })
            }
            _ => json!({ "error": self.to_string(), "code": code }),
        };
        (status, Json(body)).into_response()
    }
}
