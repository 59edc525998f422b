//! Errors raised while assembling or reading a return document.

use std::fmt;

use itr_core::{CanonicalizationError, ItrType};
use thiserror::Error;

/// A single JSON Schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the violating value in the document.
    pub instance_path: String,
    /// JSON Pointer to the schema keyword that failed.
    pub schema_path: String,
    /// Validator message.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Schema assembly failure. Building fails closed: nothing is emitted
/// unless every check passes.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Mandatory fields have no resolution.
    #[error("cannot build {itr}: missing required field(s): {}", .fields.join(", "))]
    MissingField {
        itr: ItrType,
        /// Every missing field or field group, in requirement order.
        fields: Vec<String>,
    },

    /// Resolved fields the form has no schedule for.
    #[error("{itr} has no schedule for field(s): {}", .fields.join(", "))]
    FieldNotPermitted { itr: ItrType, fields: Vec<String> },

    /// Forms without a builder (ITR-5, ITR-6, ITR-7).
    #[error("no return document builder for {itr}")]
    UnsupportedForm { itr: ItrType },

    /// The computation does not match the resolved values.
    #[error("tax computation is stale: {reason}")]
    StaleComputation { reason: String },

    /// The assembled document failed JSON Schema validation.
    #[error("{itr} document failed schema validation: {}", join_violations(.violations))]
    SchemaViolation {
        itr: ItrType,
        violations: Vec<Violation>,
    },

    /// An embedded schema could not be compiled.
    #[error("schema for {itr} could not be loaded: {reason}")]
    SchemaLoad { itr: ItrType, reason: String },

    /// A document handed to the parser is not a return document.
    #[error("malformed return document: {reason}")]
    MalformedDocument { reason: String },

    /// Canonicalization for the content digest failed.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
}

impl BuildError {
    /// Field identifiers this error refers to, if any.
    pub fn fields(&self) -> &[String] {
        match self {
            Self::MissingField { fields, .. } | Self::FieldNotPermitted { fields, .. } => fields,
            _ => &[],
        }
    }
}
