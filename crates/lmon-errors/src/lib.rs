//! Typed error model for the settlement exposure monitor core.
//!
//! Every fallible operation in `lmon-db`, `lmon-rules`, and `lmon-core`
//! returns `Result<T, Error>`. `Error` is deliberately small and closed —
//! five variants, one per failure kind named by the design — so the HTTP
//! layer in `lmon-daemon` can map it to a status code with a single `match`
//! and nothing falls through to a generic 500 by accident.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input shape or enum value invalid. No state change.
    #[error("validation failed: {} field error(s)", .errors.len())]
    Validation { errors: Vec<FieldError> },

    /// A duplicate row exists and the caller required strict insertion.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Approval workflow precondition not met (wrong state, segregation of
    /// duties violated).
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Database, rule provider, or exchange-rate provider failed.
    #[error("upstream dependency failed: {0}")]
    Upstream(String),

    /// Raised only during startup when the rule cache cannot initialize.
    #[error("fatal startup failure: {0}")]
    Fatal(String),
}

impl Error {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        Error::Validation { errors }
    }

    pub fn validation_one(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Precondition(_) => StatusCode::BAD_REQUEST,
            Error::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Fatal(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            // SQLSTATE 23505 — unique_violation. The store layer is expected
            // to translate known idempotent-duplicate cases itself; any
            // unique violation that reaches here is a genuine conflict the
            // caller asked to be told about.
            if db_err.code().as_deref() == Some("23505") {
                return Error::Conflict(db_err.message().to_string());
            }
        }
        Error::Upstream(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Upstream(e.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponseBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Error::Validation { errors } => ErrorResponseBody {
                status: "error",
                message: self.to_string(),
                errors: Some(errors.clone()),
            },
            _ => ErrorResponseBody {
                status: "error",
                message: self.to_string(),
                errors: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
