//! # Error Types
//!
//! Core-level errors shared by every crate in the workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Validation errors always carry the field identifiers involved, so the
//!   UI can route the user to the exact section of the return.
//! - Lifecycle errors (invalid transitions, stale writes, immutability)
//!   live in `itr-state::FilingError`, which wraps these.

use thiserror::Error;

/// Top-level error type for core operations.
#[derive(Error, Debug)]
pub enum ItrError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A user-supplied value was missing or malformed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A missing or malformed field, recoverable by user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more required fields have no accepted value.
    #[error("missing required field(s): {}", .fields.join(", "))]
    MissingFields {
        /// Field identifiers, in catalogue order.
        fields: Vec<String>,
    },

    /// A field value failed a format or range check.
    #[error("invalid value for {field}: {reason}")]
    InvalidField {
        /// Field identifier.
        field: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for a single missing field.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingFields {
            fields: vec![field.into()],
        }
    }

    /// Shorthand for an invalid field.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The field identifiers this error refers to.
    pub fn fields(&self) -> Vec<&str> {
        match self {
            Self::MissingFields { fields } => fields.iter().map(String::as_str).collect(),
            Self::InvalidField { field, .. } => vec![field.as_str()],
        }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// A non-integer number at `path`; amounts must be decimal strings.
    #[error("float {value} at {path}: amounts must be decimal strings or whole rupees")]
    FloatRejected { path: String, value: f64 },

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
