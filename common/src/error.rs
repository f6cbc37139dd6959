use async_openai::error::OpenAIError;
use thiserror::Error;
use tokio::task::JoinError;

/// Core internal error type shared by every crate in the workspace.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] surrealdb::Error),
    #[error("openai error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("llm parsing error: {0}")]
    LlmParsing(String),
    #[error("task join error: {0}")]
    Join(#[from] JoinError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("processing error: {0}")]
    Processing(String),
    #[error("transient dependency error: {0}")]
    Transient(String),
    #[error("internal service error: {0}")]
    InternalError(String),
}

impl AppError {
    /// Classifies an error as retryable transport/backend failure versus a
    /// permanent one. Drives the job queue's PENDING-with-backoff vs FAILED
    /// transition (see the job queue state machine) and the RPC facade's
    /// `TRANSIENT_FAILURE` vs other error codes.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Transient(_) => true,
            AppError::Reqwest(e) => e.is_timeout() || e.is_connect() || e.status().is_none_or(|s| s.is_server_error() || s.as_u16() == 429),
            AppError::OpenAI(OpenAIError::Reqwest(_)) => true,
            AppError::OpenAI(OpenAIError::ApiError(e)) => e
                .code
                .as_deref()
                .is_some_and(|c| c == "rate_limit_exceeded" || c == "server_error"),
            AppError::Database(_) => true,
            AppError::LlmParsing(_) => true,
            AppError::Io(_) => true,
            _ => false,
        }
    }

    /// Short machine-readable tag stored on a failed job row and echoed in
    /// `status` reports.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::OpenAI(_) => "openai_error",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation_error",
            AppError::LlmParsing(_) => "llm_parsing_error",
            AppError::Join(_) => "join_error",
            AppError::Io(_) => "io_error",
            AppError::Reqwest(_) => "http_error",
            AppError::Anyhow(_) => "internal_error",
            AppError::Processing(_) => "processing_error",
            AppError::Transient(_) => "transient_error",
            AppError::InternalError(_) => "internal_error",
        }
    }
}
