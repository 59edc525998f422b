//! # Actors and the Role Guard
//!
//! Authentication happens upstream; the registry receives an [`Actor`]
//! already resolved to a role. The guard is evaluated before the
//! transition table, so a denied action never reveals whether the
//! transition itself would have been legal.

use serde::{Deserialize, Serialize};

use crate::error::FilingError;

// ─── Role ────────────────────────────────────────────────────────────

/// Who is acting on a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Taxpayer,
    CharteredAccountant,
    Admin,
    /// Gateway callbacks and background jobs.
    System,
}

impl Role {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Taxpayer => "taxpayer",
            Self::CharteredAccountant => "chartered_accountant",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "taxpayer" => Ok(Self::Taxpayer),
            "chartered_accountant" => Ok(Self::CharteredAccountant),
            "admin" => Ok(Self::Admin),
            "system" => Ok(Self::System),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

// ─── Action ──────────────────────────────────────────────────────────

/// Every operation the registry exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    CreateFiling,
    AddFact,
    Reconcile,
    ResolveManually,
    SelectRegime,
    AttachSchedule,
    CompleteIntake,
    Compute,
    CompareRegimes,
    Review,
    MarkReady,
    Submit,
    ApplyVerification,
    MarkProcessed,
    Reject,
    Restart,
    Void,
    ProposeItrSwitch,
    ConfirmItrSwitch,
    CreateRevisedReturn,
}

impl Action {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::CreateFiling => "create_filing",
            Self::AddFact => "add_fact",
            Self::Reconcile => "reconcile",
            Self::ResolveManually => "resolve_manually",
            Self::SelectRegime => "select_regime",
            Self::AttachSchedule => "attach_schedule",
            Self::CompleteIntake => "complete_intake",
            Self::Compute => "compute",
            Self::CompareRegimes => "compare_regimes",
            Self::Review => "review",
            Self::MarkReady => "mark_ready",
            Self::Submit => "submit",
            Self::ApplyVerification => "apply_verification",
            Self::MarkProcessed => "mark_processed",
            Self::Reject => "reject",
            Self::Restart => "restart",
            Self::Void => "void",
            Self::ProposeItrSwitch => "propose_itr_switch",
            Self::ConfirmItrSwitch => "confirm_itr_switch",
            Self::CreateRevisedReturn => "create_revised_return",
        }
    }

    /// Whether `role` may perform this action.
    pub fn permits(&self, role: Role) -> bool {
        use Role::*;
        match self {
            Self::Read => true,
            Self::Void => role == Admin,
            Self::ApplyVerification | Self::MarkProcessed => role == System,
            Self::Reject => matches!(role, CharteredAccountant | Admin),
            _ => matches!(role, Taxpayer | CharteredAccountant | Admin),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Actor ───────────────────────────────────────────────────────────

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Opaque user or service id, recorded on transitions and resolutions.
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }

    /// The callback identity used by gateway integrations.
    pub fn system() -> Self {
        Self::new("system", Role::System)
    }

    /// Fail with `Unauthorized` unless this actor may perform `action`.
    pub fn authorize(&self, action: Action) -> Result<(), FilingError> {
        if action.permits(self.role) {
            Ok(())
        } else {
            tracing::warn!(actor = %self.id, role = %self.role, %action, "action denied");
            Err(FilingError::Unauthorized {
                role: self.role,
                action,
            })
        }
    }
}
