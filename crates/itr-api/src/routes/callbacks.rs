//! # Gateway Callbacks
//!
//! - **POST `/v1/callbacks/verification`**: e-verification outcome
//! - **POST `/v1/callbacks/processing`**: processing completed
//!
//! Both act as the system identity and are accepted on filed returns.
//! Revisions are not checked: the gateway does not read filings.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use itr_state::{FilingView, ProcessingEvent, VerificationEvent};

use crate::auth::GatewayCaller;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_validated_json, Validate};
use crate::state::AppState;

/// A processing event; the intimation reference must be present.
#[derive(Debug, serde::Deserialize)]
#[serde(transparent)]
pub struct ProcessingEventBody(pub ProcessingEvent);

impl Validate for ProcessingEventBody {
    fn validate(&self) -> Result<(), String> {
        if self.0.intimation_ref.trim().is_empty() {
            return Err("intimation_ref must not be empty".to_string());
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/callbacks/verification", post(verification))
        .route("/v1/callbacks/processing", post(processing))
}

async fn verification(
    State(state): State<AppState>,
    GatewayCaller(actor): GatewayCaller,
    body: Result<Json<VerificationEvent>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let event = extract_json(body)?;
    let filing = state.registry.apply_verification(&actor, &event)?;
    Ok(Json(filing.view()))
}

async fn processing(
    State(state): State<AppState>,
    GatewayCaller(actor): GatewayCaller,
    body: Result<Json<ProcessingEventBody>, JsonRejection>,
) -> Result<Json<FilingView>, AppError> {
    let ProcessingEventBody(event) = extract_validated_json(body)?;
    let filing = state.registry.mark_processed(&actor, &event)?;
    Ok(Json(filing.view()))
}
