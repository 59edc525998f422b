//! # Filing Lifecycle API
//!
//! HTTP surface over [`FilingRegistry`](itr_state::FilingRegistry):
//!
//! - **POST `/v1/filings`**: open a filing
//! - **GET `/v1/filings/{id}`**: the full filing record
//! - **GET `/v1/owners/{owner_id}/filings`**: every filing of an account
//! - **POST `/v1/filings/{id}/facts`**: add a reported value
//! - **POST `/v1/filings/{id}/reconcile`**: re-run reconciliation
//! - **POST `/v1/filings/{id}/resolutions`**: pin a field to one fact
//! - **PUT `/v1/filings/{id}/regime`**: select old or new regime
//! - **POST `/v1/filings/{id}/schedules`**: attach a supporting schedule
//! - **POST `/v1/filings/{id}/{action}`**: `complete-intake`, `compute`,
//!   `review`, `mark-ready`, `submit`, `reject`, `restart`, `void`
//! - **GET `/v1/filings/{id}/regime-comparison`**, **GET `/v1/filings/{id}/recommendation`**
//! - **POST `/v1/filings/{id}/itr-switch`** and **POST `/v1/filings/{id}/itr-switch/confirm`**
//! - **POST `/v1/filings/{id}/revisions`**: open a revised return
//! - **GET `/v1/filings/{id}/versions/current`**: the current return document
//!
//! Every mutation carries the `expected_revision` the caller last read and
//! answers with the filing's new [`FilingView`], so the next call can use
//! its `revision`.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use itr_core::{AssessmentYear, FactId, FieldId, FilingFor, FilingId, ItrType, OwnerId, Pan, Regime};
use itr_forms::{Recommendation, ScheduleKind};
use itr_reconcile::{FactDraft, Reconciliation, Resolution};
use itr_state::{Filing, FilingView, NewFiling, ReturnVersion, SubmissionReceipt, SwitchProposal};
use itr_tax::RegimeComparison;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

// ─── Request / Response types ────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateFilingRequest {
    pub owner_id: Uuid,
    pub pan: String,
    pub assessment_year: AssessmentYear,
    #[serde(default = "own")]
    pub filing_for: FilingFor,
    pub itr_type: ItrType,
}

fn own() -> FilingFor {
    FilingFor::Own
}

/// Body of lifecycle actions that carry nothing but the revision.
#[derive(Debug, Deserialize)]
pub struct RevisionRequest {
    pub expected_revision: u64,
}

#[derive(Debug, Deserialize)]
pub struct AddFactRequest {
    pub expected_revision: u64,
    pub fact: FactDraft,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub expected_revision: u64,
    pub field: FieldId,
    pub fact_id: FactId,
    pub note: String,
}

impl Validate for ResolveRequest {
    fn validate(&self) -> Result<(), String> {
        if self.note.trim().is_empty() {
            return Err("note must explain the manual resolution".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct RegimeRequest {
    pub expected_revision: u64,
    pub regime: Regime,
}

#[derive(Debug, Deserialize)]
pub struct AttachScheduleRequest {
    pub expected_revision: u64,
    pub schedule: ScheduleKind,
    /// Document store reference for the uploaded schedule.
    pub reference: String,
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub expected_revision: u64,
    pub reason: String,
}

impl Validate for ReasonRequest {
    fn validate(&self) -> Result<(), String> {
        if self.reason.trim().is_empty() {
            return Err("reason must not be empty".to_string());
        }
        if self.reason.len() > 1000 {
            return Err("reason must not exceed 1000 characters".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ProposeSwitchRequest {
    pub expected_revision: u64,
    /// Omit to propose the recommended form.
    #[serde(default)]
    pub target: Option<ItrType>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmSwitchRequest {
    pub expected_revision: u64,
    pub itr_type: ItrType,
}

/// An operation's result together with the filing it left behind.
#[derive(Debug, Serialize, Deserialize)]
pub struct Outcome<T> {
    pub result: T,
    pub filing: FilingView,
}

// ─── Router ──────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/filings", post(create_filing))
        .route("/v1/filings/{id}", get(get_filing))
        .route("/v1/owners/{owner_id}/filings", get(list_filings))
        .route("/v1/filings/{id}/facts", post(add_fact))
        .route("/v1/filings/{id}/reconcile", post(reconcile))
        .route("/v1/filings/{id}/resolutions", post(resolve_manually))
        .route("/v1/filings/{id}/regime", put(select_regime))
        .route("/v1/filings/{id}/schedules", post(attach_schedule))
        .route("/v1/filings/{id}/complete-intake", post(complete_intake))
        .route("/v1/filings/{id}/compute", post(compute))
        .route("/v1/filings/{id}/review", post(review))
        .route("/v1/filings/{id}/mark-ready", post(mark_ready))
        .route("/v1/filings/{id}/submit", post(submit))
        .route("/v1/filings/{id}/reject", post(reject))
        .route("/v1/filings/{id}/restart", post(restart))
        .route("/v1/filings/{id}/void", post(void))
        .route("/v1/filings/{id}/regime-comparison", get(compare_regimes))
        .route("/v1/filings/{id}/recommendation", get(recommend))
        .route("/v1/filings/{id}/itr-switch", post(propose_itr_switch))
        .route("/v1/filings/{id}/itr-switch/confirm", post(confirm_itr_switch))
        .route("/v1/filings/{id}/revisions", post(create_revised_return))
        .route("/v1/filings/{id}/versions/current", get(current_version))
}

// ─── Handlers ────────────────────────────────────────────────────────

async fn create_filing(
    State(state): State<AppState>,
    Caller(actor): Caller,
    body: Result<Json<CreateFilingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Filing>), AppError> {
    let req = extract_json(body)?;
    let new = NewFiling {
        owner: OwnerId(req.owner_id),
        pan: Pan::new(&req.pan)?,
        assessment_year: req.assessment_year,
        filing_for: req.filing_for,
        itr_type: req.itr_type,
    };
    let filing = state.registry.create_filing(&actor, new)?;
    Ok((StatusCode::CREATED, Json(filing)))
}

async fn get_filing(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Filing>, AppError> {
    Ok(Json(state.registry.get(FilingId(id), &actor)?))
}

async fn list_filings(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(owner_id): Path<Uuid>,
) -> Result<Json<Vec<FilingView>>, AppError> {
    let filings = state.registry.list_for_owner(OwnerId(owner_id), &actor)?;
    Ok(Json(filings.iter().map(Filing::view).collect()))
}

async fn add_fact(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<AddFactRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Outcome<FactId>>), AppError> {
    let req = extract_json(body)?;
    let id = FilingId(id);
    let fact_id = state.registry.add_fact(id, &actor, req.expected_revision, req.fact)?;
    Ok((StatusCode::CREATED, Json(outcome(&state, id, fact_id)?)))
}

async fn reconcile(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RevisionRequest>, JsonRejection>,
) -> Result<Json<Outcome<Reconciliation>>, AppError> {
    let req = extract_json(body)?;
    let id = FilingId(id);
    let reconciliation = state.registry.reconcile(id, &actor, req.expected_revision)?;
    Ok(Json(outcome(&state, id, reconciliation)?))
}

async fn resolve_manually(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<Outcome<Resolution>>, AppError> {
    let req = extract_validated_json(body)?;
    let id = FilingId(id);
    let resolution =
        state
            .registry
            .resolve_manually(id, &actor, req.expected_revision, &req.field, req.fact_id, req.note)?;
    Ok(Json(outcome(&state, id, resolution)?))
}

async fn select_regime(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RegimeRequest>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let req = extract_json(body)?;
    let filing = state
        .registry
        .select_regime(FilingId(id), &actor, req.expected_revision, req.regime)?;
    Ok(Json(filing.view()))
}

async fn attach_schedule(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<AttachScheduleRequest>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let req = extract_json(body)?;
    let filing = state.registry.attach_schedule(
        FilingId(id),
        &actor,
        req.expected_revision,
        req.schedule,
        req.reference,
    )?;
    Ok(Json(filing.view()))
}

async fn complete_intake(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RevisionRequest>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let req = extract_json(body)?;
    let filing = state
        .registry
        .complete_intake(FilingId(id), &actor, req.expected_revision)?;
    Ok(Json(filing.view()))
}

async fn compute(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RevisionRequest>, JsonRejection>,
) -> Result<Json<Outcome<ReturnVersion>>, AppError> {
    let req = extract_json(body)?;
    let id = FilingId(id);
    let version = state.registry.compute(id, &actor, req.expected_revision)?;
    Ok(Json(outcome(&state, id, version)?))
}

async fn review(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RevisionRequest>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let req = extract_json(body)?;
    let filing = state.registry.review(FilingId(id), &actor, req.expected_revision)?;
    Ok(Json(filing.view()))
}

async fn mark_ready(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RevisionRequest>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let req = extract_json(body)?;
    let filing = state.registry.mark_ready(FilingId(id), &actor, req.expected_revision)?;
    Ok(Json(filing.view()))
}

/// Retries sleep between attempts, so the call runs on the blocking pool.
async fn submit(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RevisionRequest>, JsonRejection>,
) -> Result<Json<Outcome<SubmissionReceipt>>, AppError> {
    let req = extract_json(body)?;
    let id = FilingId(id);
    let registry = state.registry.clone();
    let policy = state.config.retry;
    let receipt = tokio::task::spawn_blocking(move || {
        registry.submit_with_retry(id, &actor, req.expected_revision, &policy)
    })
    .await
    .map_err(|e| AppError::Internal(format!("submission task failed: {e}")))??;
    Ok(Json(outcome(&state, id, receipt)?))
}

async fn reject(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<ReasonRequest>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let req = extract_validated_json(body)?;
    let filing = state
        .registry
        .reject(FilingId(id), &actor, req.expected_revision, req.reason)?;
    Ok(Json(filing.view()))
}

async fn restart(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<RevisionRequest>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let req = extract_json(body)?;
    let filing = state.registry.restart(FilingId(id), &actor, req.expected_revision)?;
    Ok(Json(filing.view()))
}

async fn void(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<ReasonRequest>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let req = extract_validated_json(body)?;
    let filing = state
        .registry
        .void(FilingId(id), &actor, req.expected_revision, req.reason)?;
    Ok(Json(filing.view()))
}

async fn compare_regimes(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<RegimeComparison>, AppError> {
    Ok(Json(state.registry.compare_regimes(FilingId(id), &actor)?))
}

async fn recommend(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Recommendation>, AppError> {
    Ok(Json(state.registry.recommend(FilingId(id), &actor)?))
}

async fn propose_itr_switch(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<ProposeSwitchRequest>, JsonRejection>,
) -> Result<Json<Outcome<Option<SwitchProposal>>>, AppError> {
    let req = extract_json(body)?;
    let id = FilingId(id);
    let proposal = state
        .registry
        .propose_itr_switch(id, &actor, req.expected_revision, req.target)?;
    Ok(Json(outcome(&state, id, proposal)?))
}

async fn confirm_itr_switch(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<ConfirmSwitchRequest>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let req = extract_json(body)?;
    let filing = state
        .registry
        .confirm_itr_switch(FilingId(id), &actor, req.expected_revision, req.itr_type)?;
    Ok(Json(filing.view()))
}

async fn create_revised_return(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Filing>), AppError> {
    let filing = state.registry.create_revised_return(FilingId(id), &actor)?;
    Ok((StatusCode::CREATED, Json(filing)))
}

async fn current_version(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = FilingId(id);
    state
        .registry
        .current_version(id, &actor)?
        .map(|v| Json(v.document.document))
        .ok_or_else(|| AppError::NotFound(format!("filing {id} has no current return version")))
}

fn outcome<T>(state: &AppState, id: FilingId, result: T) -> Result<Outcome<T>, AppError> {
    Ok(Outcome {
        result,
        filing: state.registry.view(id)?,
    })
}
