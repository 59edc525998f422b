//! # Filing Status
//!
//! ```text
//! Draft ──▶ IntakeComplete ──▶ Computed ──▶ Reviewed ──▶ ReadyToSubmit ──▶ Submitted ──▶ EVerified ──▶ Processed
//!   ▲            │                │            │               │
//!   └────────────┴────────────────┴────────────┘               │   (reopen on edit or form switch)
//!   │                                                          │
//!   │   any pre-submission state ──▶ Rejected ──▶ Draft (restart)
//!   │   any pre-submission state or Rejected ──▶ Void (terminal)
//! ```
//!
//! [`FilingStatus::can_transition_to`] is the only place legality is
//! decided. Role checks run before it and never replace it.

use serde::{Deserialize, Serialize};

use itr_core::Timestamp;

/// Lifecycle state of a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Draft,
    IntakeComplete,
    Computed,
    Reviewed,
    ReadyToSubmit,
    Submitted,
    #[serde(rename = "e_verified")]
    EVerified,
    Processed,
    Rejected,
    Void,
}

impl FilingStatus {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::IntakeComplete => "intake_complete",
            Self::Computed => "computed",
            Self::Reviewed => "reviewed",
            Self::ReadyToSubmit => "ready_to_submit",
            Self::Submitted => "submitted",
            Self::EVerified => "e_verified",
            Self::Processed => "processed",
            Self::Rejected => "rejected",
            Self::Void => "void",
        }
    }

    /// Every status, in lifecycle order.
    pub fn all() -> &'static [FilingStatus] {
        &[
            Self::Draft,
            Self::IntakeComplete,
            Self::Computed,
            Self::Reviewed,
            Self::ReadyToSubmit,
            Self::Submitted,
            Self::EVerified,
            Self::Processed,
            Self::Rejected,
            Self::Void,
        ]
    }

    /// States before the return has reached the gateway.
    pub fn is_pre_submission(&self) -> bool {
        matches!(
            self,
            Self::Draft | Self::IntakeComplete | Self::Computed | Self::Reviewed | Self::ReadyToSubmit
        )
    }

    /// States whose data can never change again (callbacks aside).
    pub fn is_immutable(&self) -> bool {
        matches!(self, Self::Submitted | Self::EVerified | Self::Processed | Self::Void)
    }

    /// States that hold the owner's in-progress slot for a year.
    pub fn holds_in_progress_slot(&self) -> bool {
        self.is_pre_submission() || *self == Self::Rejected
    }

    /// Whether the return has been accepted by the gateway.
    pub fn is_filed(&self) -> bool {
        matches!(self, Self::Submitted | Self::EVerified | Self::Processed)
    }

    /// The transition table.
    pub fn can_transition_to(&self, to: FilingStatus) -> bool {
        use FilingStatus::*;
        match (self, to) {
            (Draft, IntakeComplete)
            | (IntakeComplete, Computed)
            | (Computed, Reviewed)
            | (Reviewed, ReadyToSubmit)
            | (ReadyToSubmit, Submitted)
            | (Submitted, EVerified)
            | (EVerified, Processed) => true,
            (IntakeComplete | Computed | Reviewed | ReadyToSubmit, Draft) => true,
            (from, Rejected) if from.is_pre_submission() => true,
            (Rejected, Draft) => true,
            (from, Void) if from.is_pre_submission() || *from == Rejected => true,
            _ => false,
        }
    }

    /// Statuses reachable in one step.
    pub fn successors(&self) -> Vec<FilingStatus> {
        Self::all()
            .iter()
            .copied()
            .filter(|to| self.can_transition_to(*to))
            .collect()
    }
}

impl std::fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in a filing's transition log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: FilingStatus,
    pub to: FilingStatus,
    pub at: Timestamp,
    /// Actor id, or `system` for callbacks.
    pub actor: String,
    pub reason: String,
}
