//! Reconciliation errors.

use itr_core::{FactId, FieldId, ValidationError};
use thiserror::Error;

/// Failure to record a fact or apply a resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    /// A fact or configuration value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The referenced fact does not exist on this filing.
    #[error("fact {fact_id} not found")]
    UnknownFact {
        /// The missing fact.
        fact_id: FactId,
    },

    /// The referenced fact reports a different field.
    #[error("fact {fact_id} reports {actual}, not {field}")]
    FieldMismatch {
        /// The fact.
        fact_id: FactId,
        /// The field the caller tried to resolve.
        field: FieldId,
        /// The field the fact actually reports.
        actual: FieldId,
    },
}
