//! # Filing Registry
//!
//! Owns every filing and serializes writes per filing. The index is a
//! `parking_lot::RwLock`; each filing sits behind its own
//! `parking_lot::Mutex`, so different filings are computed and submitted
//! concurrently while one filing only ever has one writer.
//!
//! Every user write runs the same way:
//!
//! 1. role guard ([`Actor::authorize`]),
//! 2. per-filing lock,
//! 3. `expected_revision` check (`ConcurrentModification` on mismatch),
//! 4. the operation on a working copy,
//! 5. commit and revision bump, only if the operation succeeded.
//!
//! Locks are always taken filing first, index second.

use std::collections::HashMap;
use std::sync::Arc;

use itr_core::{
    AckNumber, AssessmentYear, FactId, FieldId, FilingFor, FilingId, ItrType, OwnerId, Pan,
    Regime, Timestamp, ValidationError,
};
use itr_forms::{ineligibility, recommend, IncomeProfile, Recommendation, ScheduleKind};
use itr_reconcile::{FactDraft, Reconciler, Reconciliation, Resolution};
use itr_schema::{BuildContext, ReturnBuilder};
use itr_tax::{RegimeComparison, TableProvider, TableSet, TaxCalculator, TaxInput};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::actor::{Action, Actor};
use crate::error::{FilingError, SubmissionError};
use crate::filing::{Filing, FilingKey, FilingView, ReturnVersion, SwitchProposal};
use crate::ports::{
    FactFeed, FeedRequest, GatewayError, ProcessingEvent, SandboxGateway, SubmissionGateway,
    VerificationEvent,
};
use crate::status::FilingStatus;
use crate::submission::{RetryPolicy, SubmissionReceipt};

/// Input to [`FilingRegistry::create_filing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFiling {
    pub owner: OwnerId,
    pub pan: Pan,
    pub assessment_year: AssessmentYear,
    pub filing_for: FilingFor,
    pub itr_type: ItrType,
}

#[derive(Default)]
struct Index {
    filings: HashMap<FilingId, Arc<Mutex<Filing>>>,
    in_progress: HashMap<FilingKey, FilingId>,
    acks: HashMap<AckNumber, FilingId>,
}

/// All filings, their collaborators, and the lifecycle operations.
pub struct FilingRegistry {
    index: RwLock<Index>,
    tables: Arc<dyn TableProvider>,
    reconciler: Reconciler,
    builder: ReturnBuilder,
    gateway: Arc<dyn SubmissionGateway>,
}

impl std::fmt::Debug for FilingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index = self.index.read();
        f.debug_struct("FilingRegistry")
            .field("filings", &index.filings.len())
            .field("in_progress", &index.in_progress.len())
            .field("acks", &index.acks.len())
            .field("reconciler", &self.reconciler)
            .finish()
    }
}

impl FilingRegistry {
    /// Assemble a registry. Compiles the return schemas once.
    pub fn new(
        tables: Arc<dyn TableProvider>,
        reconciler: Reconciler,
        gateway: Arc<dyn SubmissionGateway>,
    ) -> Result<Self, FilingError> {
        Ok(Self {
            index: RwLock::new(Index::default()),
            tables,
            reconciler,
            builder: ReturnBuilder::new()?,
            gateway,
        })
    }

    /// Built-in tables, default tolerances and an in-memory gateway.
    pub fn sandbox() -> Result<Self, FilingError> {
        Self::new(
            Arc::new(TableSet::builtin()?),
            Reconciler::default(),
            Arc::new(SandboxGateway::new()),
        )
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    // ─── Plumbing ────────────────────────────────────────────────────

    fn entry(&self, id: FilingId) -> Result<Arc<Mutex<Filing>>, FilingError> {
        self.index
            .read()
            .filings
            .get(&id)
            .cloned()
            .ok_or(FilingError::NotFound { filing_id: id })
    }

    fn check_revision(filing: &Filing, expected: Option<u64>) -> Result<(), FilingError> {
        match expected {
            Some(expected) if expected != filing.revision => Err(FilingError::ConcurrentModification {
                expected,
                actual: filing.revision,
            }),
            _ => Ok(()),
        }
    }

    /// Guard, lock, check the revision, run `op` on a working copy, commit.
    fn write<R>(
        &self,
        id: FilingId,
        actor: &Actor,
        action: Action,
        expected_revision: Option<u64>,
        op: impl FnOnce(&mut Filing, Timestamp) -> Result<R, FilingError>,
    ) -> Result<R, FilingError> {
        actor.authorize(action)?;
        let entry = self.entry(id)?;
        let mut guard = entry.lock();
        Self::check_revision(&guard, expected_revision)?;
        let mut working = guard.clone();
        let out = op(&mut working, Timestamp::now())?;
        working.revision += 1;
        *guard = working;
        Ok(out)
    }

    /// [`Self::write`] returning the committed filing.
    fn update(
        &self,
        id: FilingId,
        actor: &Actor,
        action: Action,
        expected_revision: Option<u64>,
        op: impl FnOnce(&mut Filing, Timestamp) -> Result<(), FilingError>,
    ) -> Result<Filing, FilingError> {
        self.write(id, actor, action, expected_revision, |filing, now| {
            op(filing, now)?;
            let mut committed = filing.clone();
            committed.revision += 1;
            Ok(committed)
        })
    }

    fn read<R>(
        &self,
        id: FilingId,
        actor: &Actor,
        action: Action,
        op: impl FnOnce(&Filing) -> Result<R, FilingError>,
    ) -> Result<R, FilingError> {
        actor.authorize(action)?;
        let entry = self.entry(id)?;
        let guard = entry.lock();
        op(&guard)
    }

    /// Register a new filing if its key's in-progress slot is free.
    fn insert_new(&self, filing: Filing) -> Result<Filing, FilingError> {
        let mut index = self.index.write();
        let key = filing.key();
        if let Some(existing) = index.in_progress.get(&key) {
            return Err(FilingError::DuplicateFiling { existing: *existing });
        }
        index.in_progress.insert(key, filing.id);
        index
            .filings
            .insert(filing.id, Arc::new(Mutex::new(filing.clone())));
        tracing::info!(
            filing_id = %filing.id,
            owner = %filing.owner,
            assessment_year = %filing.assessment_year,
            itr_type = %filing.itr_type,
            revised = filing.original.is_some(),
            "filing created"
        );
        Ok(filing)
    }

    fn release_slot(&self, key: &FilingKey, id: FilingId) {
        let mut index = self.index.write();
        if index.in_progress.get(key) == Some(&id) {
            index.in_progress.remove(key);
        }
    }

    // ─── Creation and reads ──────────────────────────────────────────

    /// `∅ → draft`. At most one in-progress filing per
    /// `(owner, assessment year, filing_for)`.
    pub fn create_filing(&self, actor: &Actor, new: NewFiling) -> Result<Filing, FilingError> {
        actor.authorize(Action::CreateFiling)?;
        self.tables.tables(new.assessment_year)?;
        self.insert_new(Filing::new(
            new.owner,
            new.pan,
            new.assessment_year,
            new.filing_for,
            new.itr_type,
            Timestamp::now(),
        ))
    }

    /// A new draft correcting a submitted return. The original is untouched.
    pub fn create_revised_return(&self, original: FilingId, actor: &Actor) -> Result<Filing, FilingError> {
        actor.authorize(Action::CreateRevisedReturn)?;
        let snapshot = self.entry(original)?.lock().clone();
        self.insert_new(Filing::revision_of(&snapshot, Timestamp::now())?)
    }

    pub fn get(&self, id: FilingId, actor: &Actor) -> Result<Filing, FilingError> {
        self.read(id, actor, Action::Read, |f| Ok(f.clone()))
    }

    /// The narrow view other subsystems read.
    pub fn view(&self, id: FilingId) -> Result<FilingView, FilingError> {
        let entry = self.entry(id)?;
        let view = entry.lock().view();
        Ok(view)
    }

    /// Every filing of `owner`, oldest first.
    pub fn list_for_owner(&self, owner: OwnerId, actor: &Actor) -> Result<Vec<Filing>, FilingError> {
        actor.authorize(Action::Read)?;
        let entries: Vec<Arc<Mutex<Filing>>> = self.index.read().filings.values().cloned().collect();
        let mut filings: Vec<Filing> = entries
            .iter()
            .map(|e| e.lock())
            .filter(|f| f.owner == owner)
            .map(|f| f.clone())
            .collect();
        filings.sort_by_key(|f| (f.created_at, f.id));
        Ok(filings)
    }

    /// The current return version, if the filing has one.
    pub fn current_version(&self, id: FilingId, actor: &Actor) -> Result<Option<ReturnVersion>, FilingError> {
        self.read(id, actor, Action::Read, |f| Ok(f.current_version().cloned()))
    }

    // ─── Intake ──────────────────────────────────────────────────────

    /// Append a fact and re-run reconciliation.
    pub fn add_fact(
        &self,
        id: FilingId,
        actor: &Actor,
        expected_revision: u64,
        draft: FactDraft,
    ) -> Result<FactId, FilingError> {
        self.write(id, actor, Action::AddFact, Some(expected_revision), |filing, now| {
            let fact_id = filing.record_fact(draft, actor, now)?;
            let reconciliation = self.reconciler.reconcile(&filing.facts, &filing.reconciliation);
            filing.apply_reconciliation(Action::AddFact, reconciliation, actor, now)?;
            Ok(fact_id)
        })
    }

    /// Pull facts from an external feed and re-run reconciliation.
    pub fn import_facts(
        &self,
        id: FilingId,
        actor: &Actor,
        expected_revision: u64,
        feed: &dyn FactFeed,
    ) -> Result<Vec<FactId>, FilingError> {
        self.write(id, actor, Action::AddFact, Some(expected_revision), |filing, now| {
            filing.ensure_mutable(Action::AddFact)?;
            let request = FeedRequest {
                filing_id: filing.id,
                pan: filing.pan.clone(),
                assessment_year: filing.assessment_year,
            };
            let drafts = feed.fetch(&request)?;
            let mut ids = Vec::with_capacity(drafts.len());
            for draft in drafts {
                if draft.source != feed.source() {
                    return Err(FilingError::Validation(ValidationError::invalid(
                        draft.field.to_string(),
                        format!("{} feed produced a {} fact", feed.source(), draft.source),
                    )));
                }
                ids.push(filing.record_fact(draft, actor, now)?);
            }
            let reconciliation = self.reconciler.reconcile(&filing.facts, &filing.reconciliation);
            filing.apply_reconciliation(Action::AddFact, reconciliation, actor, now)?;
            tracing::info!(filing_id = %filing.id, source = %feed.source(), facts = ids.len(), "facts imported");
            Ok(ids)
        })
    }

    /// Re-run the engine. Manual resolutions are carried over untouched.
    pub fn reconcile(&self, id: FilingId, actor: &Actor, expected_revision: u64) -> Result<Reconciliation, FilingError> {
        self.write(id, actor, Action::Reconcile, Some(expected_revision), |filing, now| {
            let reconciliation = self.reconciler.reconcile(&filing.facts, &filing.reconciliation);
            filing.apply_reconciliation(Action::Reconcile, reconciliation, actor, now)?;
            Ok(filing.reconciliation.clone())
        })
    }

    /// Pin `field` to `fact_id`.
    pub fn resolve_manually(
        &self,
        id: FilingId,
        actor: &Actor,
        expected_revision: u64,
        field: &FieldId,
        fact_id: FactId,
        note: String,
    ) -> Result<Resolution, FilingError> {
        self.write(id, actor, Action::ResolveManually, Some(expected_revision), |filing, now| {
            filing.ensure_mutable(Action::ResolveManually)?;
            let reconciliation = self.reconciler.resolve_manually(
                &filing.facts,
                &filing.reconciliation,
                field,
                fact_id,
                &actor.id,
                note,
                now,
            )?;
            filing.apply_reconciliation(Action::ResolveManually, reconciliation, actor, now)?;
            filing
                .reconciliation
                .resolutions
                .get(field)
                .cloned()
                .ok_or_else(|| FilingError::Validation(ValidationError::missing(field.to_string())))
        })
    }

    pub fn select_regime(
        &self,
        id: FilingId,
        actor: &Actor,
        expected_revision: u64,
        regime: Regime,
    ) -> Result<Filing, FilingError> {
        self.update(id, actor, Action::SelectRegime, Some(expected_revision), |filing, now| {
            filing.select_regime(regime, actor, now)
        })
    }

    pub fn attach_schedule(
        &self,
        id: FilingId,
        actor: &Actor,
        expected_revision: u64,
        schedule: ScheduleKind,
        reference: String,
    ) -> Result<Filing, FilingError> {
        self.update(id, actor, Action::AttachSchedule, Some(expected_revision), |filing, now| {
            filing.attach_schedule(schedule, reference, actor, now)
        })
    }

    /// `draft → intake_complete`.
    pub fn complete_intake(&self, id: FilingId, actor: &Actor, expected_revision: u64) -> Result<Filing, FilingError> {
        self.update(id, actor, Action::CompleteIntake, Some(expected_revision), |filing, now| {
            filing.complete_intake(actor, now)
        })
    }

    // ─── Computation ─────────────────────────────────────────────────

    /// `intake_complete → computed`: compute the liability under the
    /// selected regime, build and validate the return document, and store
    /// both as a new computation and return version.
    pub fn compute(&self, id: FilingId, actor: &Actor, expected_revision: u64) -> Result<ReturnVersion, FilingError> {
        self.write(id, actor, Action::Compute, Some(expected_revision), |filing, now| {
            let regime = filing.ready_to_compute()?;
            let tables = self.tables.tables(filing.assessment_year)?;
            let resolved = filing.resolved_values();
            let computation = TaxCalculator::new(&tables).compute(&TaxInput::from_resolved(&resolved, regime))?;
            let header = filing.header();
            let document = self.builder.build(&BuildContext {
                header: &header,
                resolved: &resolved,
                computation: &computation,
            })?;
            filing.record_build(computation, document, actor, now)?;
            filing
                .current_version()
                .cloned()
                .ok_or(FilingError::Submission(SubmissionError::NoReturnVersion))
        })
    }

    /// Both regimes over the current resolved values. Nothing is stored.
    pub fn compare_regimes(&self, id: FilingId, actor: &Actor) -> Result<RegimeComparison, FilingError> {
        self.read(id, actor, Action::CompareRegimes, |filing| {
            let tables = self.tables.tables(filing.assessment_year)?;
            let input = TaxInput::from_resolved(&filing.resolved_values(), Regime::New);
            Ok(TaxCalculator::new(&tables).compare(input.total_income, &input.deductions, input.taxes_paid)?)
        })
    }

    /// The simplest eligible form for the current resolved values.
    pub fn recommend(&self, id: FilingId, actor: &Actor) -> Result<Recommendation, FilingError> {
        self.read(id, actor, Action::Read, |filing| {
            let profile = IncomeProfile::from_resolved(&filing.resolved_values(), &filing.filing_for);
            Ok(recommend(&profile, filing.itr_type))
        })
    }

    // ─── Form switching ──────────────────────────────────────────────

    /// Record a pending form switch. With no `target`, proposes the
    /// recommended form when the current one is ineligible; returns `None`
    /// (and clears any stale proposal) when no switch is needed.
    pub fn propose_itr_switch(
        &self,
        id: FilingId,
        actor: &Actor,
        expected_revision: u64,
        target: Option<ItrType>,
    ) -> Result<Option<SwitchProposal>, FilingError> {
        self.write(id, actor, Action::ProposeItrSwitch, Some(expected_revision), |filing, now| {
            filing.ensure_mutable(Action::ProposeItrSwitch)?;
            let profile = IncomeProfile::from_resolved(&filing.resolved_values(), &filing.filing_for);
            let recommendation = recommend(&profile, filing.itr_type);
            let (to, reasons) = match target {
                Some(to) if !recommendation.eligible.contains(&to) => {
                    return Err(FilingError::Validation(ValidationError::invalid(
                        "itr_type",
                        format!("{to} is not eligible: {}", ineligibility(&profile, to).join("; ")),
                    )))
                }
                Some(to) => (to, vec![format!("switch to {to} requested by {}", actor.role)]),
                None if recommendation.requires_switch => {
                    (recommendation.recommended, recommendation.reasons.clone())
                }
                None => {
                    filing.pending_switch = None;
                    return Ok(None);
                }
            };
            filing
                .propose_itr_switch(to, reasons, actor, now)
                .map(|proposal| Some(proposal.clone()))
        })
    }

    /// Apply a pending switch: status back to draft, resolutions kept.
    pub fn confirm_itr_switch(
        &self,
        id: FilingId,
        actor: &Actor,
        expected_revision: u64,
        to: ItrType,
    ) -> Result<Filing, FilingError> {
        self.update(id, actor, Action::ConfirmItrSwitch, Some(expected_revision), |filing, now| {
            filing.confirm_itr_switch(to, actor, now)
        })
    }

    // ─── Review ──────────────────────────────────────────────────────

    pub fn review(&self, id: FilingId, actor: &Actor, expected_revision: u64) -> Result<Filing, FilingError> {
        self.update(id, actor, Action::Review, Some(expected_revision), |filing, now| {
            filing.review(actor, now)
        })
    }

    pub fn mark_ready(&self, id: FilingId, actor: &Actor, expected_revision: u64) -> Result<Filing, FilingError> {
        self.update(id, actor, Action::MarkReady, Some(expected_revision), |filing, now| {
            filing.mark_ready(actor, now)
        })
    }

    pub fn reject(&self, id: FilingId, actor: &Actor, expected_revision: u64, reason: String) -> Result<Filing, FilingError> {
        self.update(id, actor, Action::Reject, Some(expected_revision), |filing, now| {
            filing.reject(actor, reason, now)
        })
    }

    pub fn restart(&self, id: FilingId, actor: &Actor, expected_revision: u64) -> Result<Filing, FilingError> {
        self.update(id, actor, Action::Restart, Some(expected_revision), |filing, now| {
            filing.restart(actor, now)
        })
    }

    /// Terminal; frees the in-progress slot.
    pub fn void(&self, id: FilingId, actor: &Actor, expected_revision: u64, reason: String) -> Result<Filing, FilingError> {
        let filing = self.update(id, actor, Action::Void, Some(expected_revision), |filing, now| {
            filing.void(actor, reason, now)
        })?;
        self.release_slot(&filing.key(), id);
        Ok(filing)
    }

    // ─── Submission ──────────────────────────────────────────────────

    /// `ready_to_submit → submitted`.
    ///
    /// The per-filing lock is held across the gateway call. A failed call
    /// is logged as a [`crate::SubmissionAttempt`] and leaves the status
    /// and revision unchanged. Submitting an already submitted filing
    /// returns the stored acknowledgement without calling the gateway.
    pub fn submit(&self, id: FilingId, actor: &Actor, expected_revision: u64) -> Result<SubmissionReceipt, FilingError> {
        actor.authorize(Action::Submit)?;
        let entry = self.entry(id)?;
        let mut guard = entry.lock();

        if let (Some(submission), true) = (&guard.submission, guard.status.is_filed()) {
            tracing::info!(filing_id = %id, key = %submission.idempotency_key, "submission replayed");
            return Ok(SubmissionReceipt {
                filing_id: id,
                ack_number: submission.ack_number.clone(),
                idempotency_key: submission.idempotency_key.clone(),
                version_id: submission.version_id,
                submitted_at: submission.submitted_at,
                replayed: true,
            });
        }

        guard.ensure_mutable(Action::Submit)?;
        Self::check_revision(&guard, Some(expected_revision))?;
        if !guard.status.can_transition_to(FilingStatus::Submitted) {
            return Err(FilingError::InvalidTransition {
                from: guard.status,
                to: FilingStatus::Submitted,
            });
        }
        let version = guard
            .current_version()
            .cloned()
            .ok_or(SubmissionError::NoReturnVersion)?;
        let key = version.idempotency_key();
        let now = Timestamp::now();

        let ack = match self.gateway.submit(&version.document, &key) {
            Ok(ack) => ack,
            Err(error) => {
                let attempt = guard.record_attempt(&key, Some(error.clone()), now);
                tracing::warn!(
                    filing_id = %id,
                    key = %key,
                    attempt,
                    retriable = error.is_retriable(),
                    error = %error,
                    "submission attempt failed"
                );
                return Err(SubmissionError::Gateway {
                    key,
                    attempt,
                    source: error,
                }
                .into());
            }
        };

        let mut index = self.index.write();
        if let Some(bound_to) = index.acks.get(&ack).copied().filter(|other| *other != id) {
            guard.record_attempt(
                &key,
                Some(GatewayError::Rejected {
                    reason: format!("acknowledgement {ack} already bound to {bound_to}"),
                }),
                now,
            );
            tracing::error!(filing_id = %id, %ack, %bound_to, "duplicate acknowledgement from gateway");
            return Err(SubmissionError::AckConflict { ack, bound_to }.into());
        }

        let mut working = guard.clone();
        let attempt = working.record_attempt(&key, None, now);
        working.record_submission(ack.clone(), version.id, key.clone(), actor, now)?;
        working.revision += 1;
        index.acks.insert(ack.clone(), id);
        let slot = working.key();
        if index.in_progress.get(&slot) == Some(&id) {
            index.in_progress.remove(&slot);
        }
        *guard = working;
        tracing::info!(filing_id = %id, key = %key, attempt, %ack, "return submitted");

        Ok(SubmissionReceipt {
            filing_id: id,
            ack_number: ack,
            idempotency_key: key,
            version_id: version.id,
            submitted_at: now,
            replayed: false,
        })
    }

    /// [`Self::submit`], retrying retriable gateway failures with
    /// exponential backoff. Exhaustion yields `RetryBudgetExhausted`; the
    /// filing stays in `ready_to_submit` with every attempt logged.
    pub fn submit_with_retry(
        &self,
        id: FilingId,
        actor: &Actor,
        expected_revision: u64,
        policy: &RetryPolicy,
    ) -> Result<SubmissionReceipt, FilingError> {
        let mut calls = 0;
        loop {
            match self.submit(id, actor, expected_revision) {
                Err(FilingError::Submission(SubmissionError::Gateway { key, source, .. }))
                    if source.is_retriable() =>
                {
                    calls += 1;
                    if calls >= policy.attempts() {
                        tracing::warn!(filing_id = %id, key = %key, attempts = calls, "submission retry budget exhausted");
                        return Err(SubmissionError::RetryBudgetExhausted {
                            key,
                            attempts: calls,
                            last: source,
                        }
                        .into());
                    }
                    let delay = policy.delay_for(calls - 1);
                    tracing::info!(filing_id = %id, key = %key, retry = calls, delay_ms = delay.as_millis() as u64, "retrying submission");
                    std::thread::sleep(delay);
                }
                other => return other,
            }
        }
    }

    // ─── Callbacks ───────────────────────────────────────────────────

    /// `submitted → e_verified`, or a logged failed verification.
    pub fn apply_verification(&self, actor: &Actor, event: &VerificationEvent) -> Result<Filing, FilingError> {
        self.update(event.filing_id, actor, Action::ApplyVerification, None, |filing, now| {
            filing.apply_verification(event, actor, now)
        })
    }

    /// `e_verified → processed`.
    pub fn mark_processed(&self, actor: &Actor, event: &ProcessingEvent) -> Result<Filing, FilingError> {
        self.update(event.filing_id, actor, Action::MarkProcessed, None, |filing, now| {
            filing.mark_processed(event, actor, now)
        })
    }
}
