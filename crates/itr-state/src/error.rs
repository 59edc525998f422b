//! Lifecycle errors.
//!
//! [`FilingError`] is what every registry operation returns. The
//! computation, reconciliation and schema crates keep their own error
//! enums; they convert into it here without losing the field identifiers
//! callers need to route a user to the right section.

use itr_core::{AckNumber, FilingId, ValidationError};
use itr_reconcile::ReconcileError;
use itr_schema::BuildError;
use itr_tax::TaxError;
use thiserror::Error;

use crate::actor::{Action, Role};
use crate::ports::{FeedError, GatewayError};
use crate::status::FilingStatus;

/// Submission failure. The filing stays in `ready_to_submit`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// The gateway refused or did not answer.
    #[error("submission {key} attempt {attempt} failed: {source}")]
    Gateway {
        key: String,
        attempt: u32,
        #[source]
        source: GatewayError,
    },

    /// Every retriable attempt failed; try again later.
    #[error("submission {key} failed after {attempts} attempt(s), try again later: {last}")]
    RetryBudgetExhausted {
        key: String,
        attempts: u32,
        last: GatewayError,
    },

    /// The gateway issued an acknowledgement already bound to another filing.
    #[error("acknowledgement {ack} is already bound to {bound_to}")]
    AckConflict { ack: AckNumber, bound_to: FilingId },

    /// There is no return version to submit.
    #[error("filing has no current return version")]
    NoReturnVersion,
}

/// Failure of a filing lifecycle operation. The filing is unchanged.
#[derive(Error, Debug)]
pub enum FilingError {
    /// Missing or malformed input; carries the field identifiers.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The transition table forbids the move.
    #[error("invalid filing transition: {from} -> {to}")]
    InvalidTransition { from: FilingStatus, to: FilingStatus },

    /// The return document could not be built.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The filing changed since the caller last read it.
    #[error("filing was modified concurrently: expected revision {expected}, found {actual}")]
    ConcurrentModification { expected: u64, actual: u64 },

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// A filed or voided return cannot be changed.
    #[error("cannot {operation} a filing in state {state}")]
    ImmutableStateViolation {
        state: FilingStatus,
        operation: &'static str,
    },

    #[error(transparent)]
    Tax(#[from] TaxError),

    /// Open blocking discrepancies must be resolved first.
    #[error("blocking discrepancies remain on: {}", .fields.join(", "))]
    BlockingDiscrepancies { fields: Vec<String> },

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("filing {filing_id} not found")]
    NotFound { filing_id: FilingId },

    /// Another filing already holds the in-progress slot.
    #[error("a filing for this owner, year and filer is already in progress: {existing}")]
    DuplicateFiling { existing: FilingId },

    #[error("role {role} may not {action}")]
    Unauthorized { role: Role, action: Action },
}

impl FilingError {
    /// Field identifiers this error refers to, if any.
    pub fn fields(&self) -> Vec<String> {
        match self {
            Self::Validation(e) => e.fields().into_iter().map(str::to_string).collect(),
            Self::Build(e) => e.fields().to_vec(),
            Self::BlockingDiscrepancies { fields } => fields.clone(),
            _ => Vec::new(),
        }
    }
}

impl From<ReconcileError> for FilingError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::Validation(e) => Self::Validation(e),
            ReconcileError::UnknownFact { fact_id } => Self::Validation(ValidationError::invalid(
                "fact_id",
                format!("fact {fact_id} does not exist on this filing"),
            )),
            ReconcileError::FieldMismatch {
                fact_id,
                field,
                actual,
            } => Self::Validation(ValidationError::invalid(
                field.to_string(),
                format!("fact {fact_id} reports {actual}"),
            )),
        }
    }
}
