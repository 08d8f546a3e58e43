use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use common::jobs::BatchState;
use serde_json::json;
use thiserror::Error;

/// The uploaded file cannot be processed at all.
///
/// Raised before any upload job or account exists.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructuralError {
    #[error("File must be a CSV file")]
    NotCsv,

    #[error("Error reading CSV file: {0}")]
    Unparseable(String),

    #[error("The CSV file is missing headers: {}", .0.join(", "))]
    MissingHeaders(Vec<String>),

    #[error("Header '{0}' contains special characters, which are not allowed.")]
    DisallowedHeaderCharacter(String),

    #[error("File must not be empty")]
    Empty,
}

/// Infrastructure failure while reading or writing persisted state.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("file storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("password hashing failed: {0}")]
    Hash(String),

    /// A unique index rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch processor is {0:?}, only an idle processor can run")]
    NotIdle(BatchState),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure of a whole bulk submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing Authorization header")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("Unable to authenticate with provided credentials")]
    InvalidCredentials,

    #[error("Only Admins and super Admins are authorized to perform this action.")]
    Forbidden,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification queue is full")]
    QueueFull,

    #[error("notification queue is closed")]
    QueueClosed,

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Everything a handler can fail with, mapped onto HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Storage(e) => ApiError::Storage(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Structural(e) => ApiError::Structural(e),
            SubmitError::Storage(e) => ApiError::Storage(e),
            SubmitError::Batch(e) => e.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Structural(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(AuthError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Structural(StructuralError::MissingHeaders(missing)) => {
                json!({ "error": self.to_string(), "missing": missing })
            }
            _ => json!({ "error": self.to_string() }),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
