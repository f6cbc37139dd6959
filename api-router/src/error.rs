use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use common::error::AppError;
use serde_json::json;
use thiserror::Error;

/// Wire-level error, one of the four codes the RPC facade contract names.
#[derive(Error, Debug, Clone)]
pub enum ApiError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("max attempts exceeded: {0}")]
    MaxAttemptsExceeded(String),
    #[error("transient failure: {0}")]
    TransientFailure(String),
    #[error("internal error")]
    Internal,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match &err {
            AppError::Validation(msg) => Self::Validation(msg.clone()),
            AppError::NotFound(msg) => Self::NotFound(msg.clone()),
            _ if err.is_transient() => Self::TransientFailure(err.to_string()),
            _ => {
                tracing::error!(error = %err, "internal error serving request");
                Self::Internal
            }
        }
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::MaxAttemptsExceeded(_) => "MAX_ATTEMPTS_EXCEEDED",
            Self::TransientFailure(_) => "TRANSIENT_FAILURE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MaxAttemptsExceeded(_) => StatusCode::CONFLICT,
            Self::TransientFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": { "code": self.code(), "message": self.to_string() }
        });
        (self.status(), Json(body)).into_response()
    }
}
