// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::session::SessionPhase;

/// Global Application Error Enum.
/// Centralizes error handling of the HTTP layer and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate exam id)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

/// Failure of the document store behind a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or rejected the operation.
    Unavailable(String),
    /// A stored document could not be decoded.
    Corrupt(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "document store unavailable: {}", msg),
            StoreError::Corrupt(msg) => write!(f, "corrupt document: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

/// Failure to load an exam paper for an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No exam with this id exists.
    NotFound(String),
    /// The store was unreachable or returned garbage.
    Network(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound(exam_id) => write!(f, "exam '{}' not found", exam_id),
            LoadError::Network(msg) => write!(f, "failed to load exam: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<StoreError> for LoadError {
    fn from(err: StoreError) -> Self {
        LoadError::Network(err.to_string())
    }
}

/// Errors surfaced by a proctored session to its host.
///
/// Alert-sync failures never appear here: they are logged and counted by
/// [`crate::session::ledger::AlertSync`] and never interrupt the exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Camera or fullscreen unavailable; the session did not start.
    Precondition(String),
    /// The exam paper could not be loaded.
    Load(LoadError),
    /// The final attempt record could not be written. Retryable.
    Submission(StoreError),
    /// The operation is not allowed in the current phase.
    InvalidPhase {
        expected: SessionPhase,
        actual: SessionPhase,
    },
    /// The selected question or option does not exist.
    InvalidAnswer { question: usize, option: usize },
    /// The session view was left; the session accepts no more input.
    Closed,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Precondition(msg) => write!(f, "session cannot start: {}", msg),
            SessionError::Load(e) => write!(f, "{}", e),
            SessionError::Submission(e) => write!(f, "submission failed, retry possible: {}", e),
            SessionError::InvalidPhase { expected, actual } => {
                write!(f, "session is {:?}, expected {:?}", actual, expected)
            }
            SessionError::InvalidAnswer { question, option } => {
                write!(f, "no option {} for question {}", option, question)
            }
            SessionError::Closed => write!(f, "session is closed"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Load(e) => Some(e),
            SessionError::Submission(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LoadError> for SessionError {
    fn from(err: LoadError) -> Self {
        SessionError::Load(err)
    }
}
