//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`FilingError`] to HTTP status codes and a JSON body carrying a
//! machine-readable code, a message and, for client errors, the field
//! identifiers the error refers to. Internal details never reach clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use itr_schema::BuildError;
use itr_state::{FilingError, GatewayError, SubmissionError};
use itr_tax::TaxError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (`NOT_FOUND`, `VALIDATION_ERROR`).
    pub code: String,
    pub message: String,
    /// `{"fields": [...]}` when the error names fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Input failed a business rule (422).
    #[error("validation error: {message}")]
    Validation { message: String, fields: Vec<String> },

    /// Request body or header could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No caller identity (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller's role may not perform the action (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with the filing's current state or revision (409).
    #[error("conflict: {message}")]
    Conflict { message: String, fields: Vec<String> },

    /// The e-filing gateway refused the return (502).
    #[error("bad gateway: {0}")]
    BadGateway(String),

    /// An upstream system is unavailable; retry later (503).
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error (500). Logged, not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            Self::BadGateway(_) => (StatusCode::BAD_GATEWAY, "BAD_GATEWAY"),
            Self::ServiceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn fields(&self) -> &[String] {
        match self {
            Self::Validation { fields, .. } | Self::Conflict { fields, .. } => fields,
            _ => &[],
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let fields = self.fields();
        let details = (!fields.is_empty()).then(|| serde_json::json!({ "fields": fields }));

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

impl From<FilingError> for AppError {
    fn from(err: FilingError) -> Self {
        let fields = err.fields();
        let message = err.to_string();
        match err {
            FilingError::Validation(_) => Self::Validation { message, fields },
            FilingError::Build(ref build) => match build {
                BuildError::MissingField { .. }
                | BuildError::FieldNotPermitted { .. }
                | BuildError::UnsupportedForm { .. }
                | BuildError::StaleComputation { .. }
                | BuildError::SchemaViolation { .. } => Self::Validation { message, fields },
                BuildError::SchemaLoad { .. }
                | BuildError::MalformedDocument { .. }
                | BuildError::Canonicalization(_) => Self::Internal(message),
            },
            FilingError::Tax(ref tax) => match tax {
                TaxError::UnknownYear { .. } | TaxError::NegativeAmount { .. } => {
                    Self::validation(message)
                }
                _ => Self::Internal(message),
            },
            FilingError::InvalidTransition { .. }
            | FilingError::ConcurrentModification { .. }
            | FilingError::ImmutableStateViolation { .. }
            | FilingError::DuplicateFiling { .. } => Self::conflict(message),
            FilingError::BlockingDiscrepancies { .. } => Self::Conflict { message, fields },
            FilingError::Submission(ref submission) => match submission {
                SubmissionError::Gateway {
                    source: GatewayError::Rejected { .. },
                    ..
                }
                | SubmissionError::AckConflict { .. } => Self::BadGateway(message),
                SubmissionError::Gateway { .. } | SubmissionError::RetryBudgetExhausted { .. } => {
                    Self::ServiceUnavailable(message)
                }
                SubmissionError::NoReturnVersion => Self::conflict(message),
            },
            FilingError::Feed(_) => Self::ServiceUnavailable(message),
            FilingError::NotFound { .. } => Self::NotFound(message),
            FilingError::Unauthorized { .. } => Self::Forbidden(message),
        }
    }
}

impl From<itr_core::ValidationError> for AppError {
    fn from(err: itr_core::ValidationError) -> Self {
        Self::Validation {
            fields: err.fields().into_iter().map(str::to_string).collect(),
            message: err.to_string(),
        }
    }
}
