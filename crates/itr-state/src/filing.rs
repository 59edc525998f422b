//! # Filing
//!
//! The aggregate a registry entry holds: header, facts and their
//! reconciliation, schedule attachments, computation and return-version
//! history, submission and callback records, and the transition log.
//!
//! Methods here are pure state changes. Locking, revisions and the role
//! guard belong to [`crate::FilingRegistry`], which applies every method to
//! a working copy and commits only on success.

use std::collections::BTreeMap;

use itr_core::{
    AckNumber, AssessmentYear, ComputationId, FactId, FieldId, FilingFor, FilingId, ItrType,
    OwnerId, Pan, Regime, ReturnVersionId, Timestamp, ValidationError,
};
use itr_forms::{ineligibility, missing_mandatory, schedules_for, IncomeProfile, ScheduleKind};
use itr_reconcile::{Fact, FactDraft, Reconciliation};
use itr_schema::{FilingHeader, SchemaDocument};
use itr_tax::TaxComputation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::actor::{Action, Actor};
use crate::error::FilingError;
use crate::ports::{GatewayError, ProcessingEvent, VerificationEvent};
use crate::status::{FilingStatus, TransitionRecord};

// ─── Records ─────────────────────────────────────────────────────────

/// The filing a revised return corrects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalReturn {
    pub filing_id: FilingId,
    pub ack_number: AckNumber,
}

/// A supporting document attached to one schedule. The reference points
/// into external document storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAttachment {
    pub schedule: ScheduleKind,
    pub reference: String,
    pub attached_by: String,
    pub attached_at: Timestamp,
}

/// An attachment set aside by a form switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedSchedule {
    pub attachment: ScheduleAttachment,
    /// The form the filing was on when the attachment was made.
    pub from_form: ItrType,
    pub archived_at: Timestamp,
}

/// A pending change of return form, awaiting explicit confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchProposal {
    pub from: ItrType,
    pub to: ItrType,
    pub reasons: Vec<String>,
    pub proposed_by: String,
    pub proposed_at: Timestamp,
}

/// An immutable tax computation snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationRecord {
    pub id: ComputationId,
    pub filing_id: FilingId,
    /// Filing revision the computation was made against.
    pub revision: u64,
    pub computed_at: Timestamp,
    pub computation: TaxComputation,
}

/// One built return document. Versions are append-only and numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnVersion {
    pub id: ReturnVersionId,
    pub filing_id: FilingId,
    pub version: u32,
    pub computation_id: ComputationId,
    pub itr_type: ItrType,
    pub document: SchemaDocument,
    pub created_at: Timestamp,
}

impl ReturnVersion {
    /// `{filing_id}:v{version}`, the gateway idempotency key.
    pub fn idempotency_key(&self) -> String {
        format!("{}:v{}", self.filing_id, self.version)
    }
}

/// One call to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAttempt {
    /// 1-based, per idempotency key.
    pub attempt: u32,
    pub idempotency_key: String,
    pub at: Timestamp,
    /// `None` on success.
    pub error: Option<GatewayError>,
    pub retriable: bool,
}

/// The accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub ack_number: AckNumber,
    pub idempotency_key: String,
    pub version_id: ReturnVersionId,
    pub submitted_at: Timestamp,
}

/// A verification callback as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub verified: bool,
    pub verified_at: Timestamp,
    pub received_at: Timestamp,
}

/// The uniqueness key for in-progress filings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilingKey {
    pub owner: OwnerId,
    pub assessment_year: AssessmentYear,
    pub filing_for: FilingFor,
}

/// The fields other subsystems may read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingView {
    pub id: FilingId,
    pub revision: u64,
    pub status: FilingStatus,
    pub itr_type: ItrType,
    pub ack_number: Option<AckNumber>,
    pub current_version: Option<ReturnVersionId>,
}

// ─── Filing ──────────────────────────────────────────────────────────

/// One tax return and everything it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filing {
    pub id: FilingId,
    pub owner: OwnerId,
    pub pan: Pan,
    pub assessment_year: AssessmentYear,
    pub filing_for: FilingFor,
    pub itr_type: ItrType,
    pub status: FilingStatus,
    pub regime: Option<Regime>,
    /// Optimistic concurrency version, bumped on every committed write.
    pub revision: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub original: Option<OriginalReturn>,

    pub facts: Vec<Fact>,
    pub reconciliation: Reconciliation,
    pub schedules: BTreeMap<ScheduleKind, Vec<ScheduleAttachment>>,
    pub archived_schedules: Vec<ArchivedSchedule>,
    pub pending_switch: Option<SwitchProposal>,

    pub computations: Vec<ComputationRecord>,
    pub versions: Vec<ReturnVersion>,
    pub current_computation: Option<ComputationId>,
    pub current_version: Option<ReturnVersionId>,

    pub submission: Option<Submission>,
    pub submission_attempts: Vec<SubmissionAttempt>,
    pub verifications: Vec<VerificationRecord>,
    pub processed_at: Option<Timestamp>,
    pub intimation_ref: Option<String>,

    pub transitions: Vec<TransitionRecord>,
}

impl Filing {
    /// A new draft.
    pub fn new(
        owner: OwnerId,
        pan: Pan,
        assessment_year: AssessmentYear,
        filing_for: FilingFor,
        itr_type: ItrType,
        now: Timestamp,
    ) -> Self {
        Self {
            id: FilingId::new(),
            owner,
            pan,
            assessment_year,
            filing_for,
            itr_type,
            status: FilingStatus::Draft,
            regime: None,
            revision: 0,
            created_at: now,
            updated_at: now,
            original: None,
            facts: Vec::new(),
            reconciliation: Reconciliation::default(),
            schedules: BTreeMap::new(),
            archived_schedules: Vec::new(),
            pending_switch: None,
            computations: Vec::new(),
            versions: Vec::new(),
            current_computation: None,
            current_version: None,
            submission: None,
            submission_attempts: Vec::new(),
            verifications: Vec::new(),
            processed_at: None,
            intimation_ref: None,
            transitions: Vec::new(),
        }
    }

    /// A draft correcting `original`, carrying its facts and resolutions.
    pub fn revision_of(original: &Filing, now: Timestamp) -> Result<Self, FilingError> {
        let ack_number = match (&original.submission, original.status.is_filed()) {
            (Some(submission), true) => submission.ack_number.clone(),
            _ => {
                return Err(FilingError::Validation(ValidationError::invalid(
                    "original",
                    format!(
                        "only a submitted return can be revised; {} is {}",
                        original.id, original.status
                    ),
                )))
            }
        };
        let mut revised = Self::new(
            original.owner,
            original.pan.clone(),
            original.assessment_year,
            original.filing_for.clone(),
            original.itr_type,
            now,
        );
        revised.regime = original.regime;
        revised.facts = original.facts.clone();
        revised.reconciliation = original.reconciliation.clone();
        revised.original = Some(OriginalReturn {
            filing_id: original.id,
            ack_number,
        });
        Ok(revised)
    }

    pub fn key(&self) -> FilingKey {
        FilingKey {
            owner: self.owner,
            assessment_year: self.assessment_year,
            filing_for: self.filing_for.clone(),
        }
    }

    pub fn view(&self) -> FilingView {
        FilingView {
            id: self.id,
            revision: self.revision,
            status: self.status,
            itr_type: self.itr_type,
            ack_number: self.submission.as_ref().map(|s| s.ack_number.clone()),
            current_version: self.current_version,
        }
    }

    /// Accepted amount per field.
    pub fn resolved_values(&self) -> BTreeMap<FieldId, Decimal> {
        self.reconciliation.resolved_values()
    }

    pub fn current_computation(&self) -> Option<&ComputationRecord> {
        let id = self.current_computation?;
        self.computations.iter().find(|c| c.id == id)
    }

    pub fn current_version(&self) -> Option<&ReturnVersion> {
        let id = self.current_version?;
        self.versions.iter().find(|v| v.id == id)
    }

    /// The header the schema builder needs.
    pub fn header(&self) -> FilingHeader {
        FilingHeader {
            pan: self.pan.clone(),
            assessment_year: self.assessment_year,
            itr_type: self.itr_type,
            filing_for: self.filing_for.clone(),
            original_ack: self.original.as_ref().map(|o| o.ack_number.clone()),
        }
    }

    // ── Guards ──

    /// Fail with `ImmutableStateViolation` once filed or voided.
    pub fn ensure_mutable(&self, action: Action) -> Result<(), FilingError> {
        if self.status.is_immutable() {
            return Err(FilingError::ImmutableStateViolation {
                state: self.status,
                operation: action.as_str(),
            });
        }
        Ok(())
    }

    fn require_transition(&self, to: FilingStatus) -> Result<(), FilingError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(FilingError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }

    /// Move to `to` if the table allows it and log the transition.
    pub fn transition(
        &mut self,
        to: FilingStatus,
        actor: &Actor,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), FilingError> {
        self.require_transition(to)?;
        let from = self.status;
        let reason = reason.into();
        tracing::info!(filing_id = %self.id, %from, %to, actor = %actor.id, reason = %reason, "filing transition");
        self.transitions.push(TransitionRecord {
            from,
            to,
            at: now,
            actor: actor.id.clone(),
            reason,
        });
        self.status = to;
        self.updated_at = now;
        Ok(())
    }

    /// Prepare for a data edit: reopen to draft when past it.
    ///
    /// Rejected filings must be restarted before they are edited.
    fn begin_edit(&mut self, action: Action, actor: &Actor, now: Timestamp) -> Result<(), FilingError> {
        self.ensure_mutable(action)?;
        match self.status {
            FilingStatus::Draft => {}
            FilingStatus::Rejected => {
                return Err(FilingError::Validation(ValidationError::invalid(
                    "status",
                    "filing is rejected; restart it before editing",
                )))
            }
            _ => {
                self.transition(FilingStatus::Draft, actor, format!("reopened by {action}"), now)?;
            }
        }
        self.invalidate_outputs();
        self.updated_at = now;
        Ok(())
    }

    /// Clear the current computation and version. History is kept.
    fn invalidate_outputs(&mut self) {
        self.current_computation = None;
        self.current_version = None;
    }

    // ── Intake ──

    /// Append a fact. Reconciliation is the caller's next step.
    pub fn record_fact(&mut self, draft: FactDraft, actor: &Actor, now: Timestamp) -> Result<FactId, FilingError> {
        self.begin_edit(Action::AddFact, actor, now)?;
        let fact = Fact::record(draft, now)?;
        let id = fact.id;
        self.facts.push(fact);
        Ok(id)
    }

    /// Replace the reconciliation after an engine run.
    pub fn apply_reconciliation(
        &mut self,
        action: Action,
        reconciliation: Reconciliation,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<(), FilingError> {
        if reconciliation == self.reconciliation {
            self.ensure_mutable(action)?;
            return Ok(());
        }
        self.begin_edit(action, actor, now)?;
        self.reconciliation = reconciliation;
        Ok(())
    }

    pub fn select_regime(&mut self, regime: Regime, actor: &Actor, now: Timestamp) -> Result<(), FilingError> {
        self.begin_edit(Action::SelectRegime, actor, now)?;
        self.regime = Some(regime);
        Ok(())
    }

    pub fn attach_schedule(
        &mut self,
        schedule: ScheduleKind,
        reference: String,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<(), FilingError> {
        self.ensure_mutable(Action::AttachSchedule)?;
        if !schedules_for(self.itr_type).contains(&schedule) {
            return Err(FilingError::Validation(ValidationError::invalid(
                "schedule",
                format!("{} has no {schedule} schedule", self.itr_type),
            )));
        }
        if reference.trim().is_empty() {
            return Err(FilingError::Validation(ValidationError::missing("reference")));
        }
        self.begin_edit(Action::AttachSchedule, actor, now)?;
        self.schedules.entry(schedule).or_default().push(ScheduleAttachment {
            schedule,
            reference,
            attached_by: actor.id.clone(),
            attached_at: now,
        });
        Ok(())
    }

    /// `draft → intake_complete` once every mandatory field is resolved.
    pub fn complete_intake(&mut self, actor: &Actor, now: Timestamp) -> Result<(), FilingError> {
        self.ensure_mutable(Action::CompleteIntake)?;
        self.require_transition(FilingStatus::IntakeComplete)?;
        let missing = missing_mandatory(self.itr_type, self.reconciliation.resolutions.keys());
        if !missing.is_empty() {
            return Err(FilingError::Validation(ValidationError::MissingFields { fields: missing }));
        }
        self.transition(FilingStatus::IntakeComplete, actor, "intake complete", now)
    }

    // ── Computation ──

    /// Check that compute may run and return the selected regime.
    pub fn ready_to_compute(&self) -> Result<Regime, FilingError> {
        self.ensure_mutable(Action::Compute)?;
        self.require_transition(FilingStatus::Computed)?;
        self.regime
            .ok_or_else(|| FilingError::Validation(ValidationError::missing("regime")))
    }

    /// Store a computation and its document, then move to `computed`.
    pub fn record_build(
        &mut self,
        computation: TaxComputation,
        document: SchemaDocument,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<ReturnVersionId, FilingError> {
        self.ready_to_compute()?;
        let record = ComputationRecord {
            id: ComputationId::new(),
            filing_id: self.id,
            revision: self.revision,
            computed_at: now,
            computation,
        };
        let version = ReturnVersion {
            id: ReturnVersionId::new(),
            filing_id: self.id,
            version: self.versions.len() as u32 + 1,
            computation_id: record.id,
            itr_type: self.itr_type,
            document,
            created_at: now,
        };
        let version_id = version.id;
        self.transition(
            FilingStatus::Computed,
            actor,
            format!("computed v{} under the {} regime", version.version, record.computation.regime),
            now,
        )?;
        self.current_computation = Some(record.id);
        self.current_version = Some(version_id);
        self.computations.push(record);
        self.versions.push(version);
        Ok(version_id)
    }

    // ── Review and readiness ──

    pub fn review(&mut self, actor: &Actor, now: Timestamp) -> Result<(), FilingError> {
        self.ensure_mutable(Action::Review)?;
        self.transition(FilingStatus::Reviewed, actor, format!("reviewed by {}", actor.role), now)
    }

    /// `reviewed → ready_to_submit` when no blocking discrepancy is open.
    pub fn mark_ready(&mut self, actor: &Actor, now: Timestamp) -> Result<(), FilingError> {
        self.ensure_mutable(Action::MarkReady)?;
        self.require_transition(FilingStatus::ReadyToSubmit)?;
        let mut fields: Vec<String> = self
            .reconciliation
            .open_blocking()
            .map(|d| d.field.to_string())
            .collect();
        fields.dedup();
        if !fields.is_empty() {
            return Err(FilingError::BlockingDiscrepancies { fields });
        }
        self.transition(FilingStatus::ReadyToSubmit, actor, "ready to submit", now)
    }

    pub fn reject(&mut self, actor: &Actor, reason: String, now: Timestamp) -> Result<(), FilingError> {
        self.ensure_mutable(Action::Reject)?;
        self.transition(FilingStatus::Rejected, actor, reason, now)
    }

    pub fn restart(&mut self, actor: &Actor, now: Timestamp) -> Result<(), FilingError> {
        self.ensure_mutable(Action::Restart)?;
        self.transition(FilingStatus::Draft, actor, "restarted", now)?;
        self.invalidate_outputs();
        Ok(())
    }

    /// Terminal. Clears every "current" pointer.
    pub fn void(&mut self, actor: &Actor, reason: String, now: Timestamp) -> Result<(), FilingError> {
        self.ensure_mutable(Action::Void)?;
        self.transition(FilingStatus::Void, actor, reason, now)?;
        self.invalidate_outputs();
        self.pending_switch = None;
        Ok(())
    }

    // ── Form switching ──

    pub fn propose_itr_switch(
        &mut self,
        to: ItrType,
        reasons: Vec<String>,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<&SwitchProposal, FilingError> {
        self.ensure_mutable(Action::ProposeItrSwitch)?;
        if to == self.itr_type {
            return Err(FilingError::Validation(ValidationError::invalid(
                "itr_type",
                format!("filing is already on {to}"),
            )));
        }
        self.updated_at = now;
        Ok(self.pending_switch.insert(SwitchProposal {
            from: self.itr_type,
            to,
            reasons,
            proposed_by: actor.id.clone(),
            proposed_at: now,
        }))
    }

    /// Apply the pending proposal for `to`: reset to draft, keep
    /// resolutions, archive attachments the new form has no schedule for.
    ///
    /// Eligibility is checked again against the current resolved values,
    /// since facts may have changed after the proposal was made.
    pub fn confirm_itr_switch(&mut self, to: ItrType, actor: &Actor, now: Timestamp) -> Result<(), FilingError> {
        self.ensure_mutable(Action::ConfirmItrSwitch)?;
        match &self.pending_switch {
            Some(p) if p.to == to => {}
            _ => {
                return Err(FilingError::Validation(ValidationError::invalid(
                    "itr_type",
                    format!("no pending switch proposal to {to}"),
                )))
            }
        }
        let profile = IncomeProfile::from_resolved(&self.resolved_values(), &self.filing_for);
        let why = ineligibility(&profile, to);
        if !why.is_empty() {
            return Err(FilingError::Validation(ValidationError::invalid(
                "itr_type",
                format!("{to} is no longer eligible: {}", why.join("; ")),
            )));
        }
        let from = self.itr_type;
        if self.status != FilingStatus::Draft {
            self.transition(FilingStatus::Draft, actor, format!("form switched from {from} to {to}"), now)?;
        }
        let kept = schedules_for(to);
        let (keep, archive): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.schedules)
            .into_iter()
            .partition(|(kind, _)| kept.contains(kind));
        self.schedules = keep;
        self.archived_schedules.extend(archive.into_values().flatten().map(|attachment| {
            ArchivedSchedule {
                attachment,
                from_form: from,
                archived_at: now,
            }
        }));
        self.itr_type = to;
        self.pending_switch = None;
        self.invalidate_outputs();
        self.updated_at = now;
        tracing::info!(filing_id = %self.id, %from, %to, "form switch applied");
        Ok(())
    }

    // ── Submission and callbacks ──

    /// Log a gateway call without touching anything else.
    pub fn record_attempt(&mut self, key: &str, error: Option<GatewayError>, now: Timestamp) -> u32 {
        let attempt = self.attempts_for(key) + 1;
        let retriable = error.as_ref().map(GatewayError::is_retriable).unwrap_or(false);
        self.submission_attempts.push(SubmissionAttempt {
            attempt,
            idempotency_key: key.to_string(),
            at: now,
            error,
            retriable,
        });
        attempt
    }

    /// Calls already made with `key`.
    pub fn attempts_for(&self, key: &str) -> u32 {
        self.submission_attempts
            .iter()
            .filter(|a| a.idempotency_key == key)
            .count() as u32
    }

    /// Bind the acknowledgement and move to `submitted`.
    pub fn record_submission(
        &mut self,
        ack_number: AckNumber,
        version: ReturnVersionId,
        key: String,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<(), FilingError> {
        self.transition(FilingStatus::Submitted, actor, format!("acknowledged {ack_number}"), now)?;
        self.submission = Some(Submission {
            ack_number,
            idempotency_key: key,
            version_id: version,
            submitted_at: now,
        });
        Ok(())
    }

    /// Record an e-verification outcome. A failed verification leaves the
    /// filing in `submitted`.
    pub fn apply_verification(
        &mut self,
        event: &VerificationEvent,
        actor: &Actor,
        now: Timestamp,
    ) -> Result<(), FilingError> {
        if self.status == FilingStatus::Void {
            return Err(FilingError::ImmutableStateViolation {
                state: self.status,
                operation: Action::ApplyVerification.as_str(),
            });
        }
        self.require_transition(FilingStatus::EVerified)?;
        self.verifications.push(VerificationRecord {
            verified: event.verified,
            verified_at: event.verified_at,
            received_at: now,
        });
        if event.verified {
            self.transition(FilingStatus::EVerified, actor, "e-verified", now)
        } else {
            tracing::warn!(filing_id = %self.id, "e-verification failed");
            self.updated_at = now;
            Ok(())
        }
    }

    pub fn mark_processed(&mut self, event: &ProcessingEvent, actor: &Actor, now: Timestamp) -> Result<(), FilingError> {
        if self.status == FilingStatus::Void {
            return Err(FilingError::ImmutableStateViolation {
                state: self.status,
                operation: Action::MarkProcessed.as_str(),
            });
        }
        self.transition(FilingStatus::Processed, actor, format!("processed, intimation {}", event.intimation_ref), now)?;
        self.processed_at = Some(event.processed_at);
        self.intimation_ref = Some(event.intimation_ref.clone());
        Ok(())
    }
}
