//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`DomainError`]s from fleet-core and repository failures to HTTP
//! status codes. Field-level problems are returned in `details` so a client
//! sees every failing field at once. Internal error details are never
//! exposed in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fleet_core::{DomainError, FieldError, FieldErrorCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::repository::RepositoryError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Error detail.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Field errors, present for 409 and 422 responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// One or more fields failed validation (422).
    #[error("{message}")]
    Validation {
        /// Summary.
        message: String,
        /// Failing fields.
        details: Vec<FieldError>,
    },

    /// A unique field collides with a live record (409).
    #[error("{message}")]
    Duplicate {
        /// Summary.
        message: String,
        /// Colliding fields.
        details: Vec<FieldError>,
    },

    /// Request could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Caller lacks the permission for this endpoint (403).
    #[error("{0}")]
    Forbidden(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    pub(crate) fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Duplicate { .. } => (StatusCode::CONFLICT, "DUPLICATE"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let (message, details) = match self {
            Self::Internal(_) => ("An internal error occurred".to_string(), None),
            Self::Validation { message, details } | Self::Duplicate { message, details } => {
                (message, Some(details))
            }
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound { .. } => Self::NotFound(err.to_string()),
            DomainError::Validation(details) => Self::Validation {
                message: "validation failed".to_string(),
                details,
            },
            DomainError::Duplicate(details) => Self::Duplicate {
                message: "a record with the same unique value already exists".to_string(),
                details,
            },
            DomainError::Layout(layout) => Self::Validation {
                message: "invalid seat layout".to_string(),
                details: vec![FieldError::new(
                    "layout",
                    FieldErrorCode::InvalidFormat,
                    layout.to_string(),
                )],
            },
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Domain(domain) => domain.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}
