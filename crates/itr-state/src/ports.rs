//! # External Interfaces
//!
//! The narrow seams between the lifecycle and systems it does not own:
//! the e-filing gateway, fact feeds (OCR and government statements) and the
//! verification/processing callbacks. Wire protocols live behind these
//! traits; the registry only sees typed results.

use std::collections::{HashMap, VecDeque};

use itr_core::{AckNumber, AssessmentYear, ContentDigest, FactSource, FilingId, Pan, Timestamp};
use itr_reconcile::FactDraft;
use itr_schema::SchemaDocument;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Submission Gateway ──────────────────────────────────────────────

/// Gateway failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayError {
    /// No answer in time. The return may or may not have been received;
    /// the idempotency key makes a retry safe.
    #[error("gateway timed out")]
    Timeout,

    #[error("gateway unavailable: {reason}")]
    Unavailable { reason: String },

    /// The gateway refused the return. Retrying the same document will not help.
    #[error("gateway rejected the return: {reason}")]
    Rejected { reason: String },
}

impl GatewayError {
    /// Whether a retry with the same key may succeed.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }
}

/// The e-filing gateway.
///
/// Implementations must treat `idempotency_key` as the identity of the
/// submission: the same key always yields the same acknowledgement.
pub trait SubmissionGateway: Send + Sync {
    fn submit(&self, document: &SchemaDocument, idempotency_key: &str) -> Result<AckNumber, GatewayError>;
}

const SANDBOX_ACK_BASE: u64 = 100_000_000_000_000;

#[derive(Debug, Default)]
struct SandboxState {
    issued: HashMap<String, (ContentDigest, AckNumber)>,
    issued_count: u64,
    scripted: VecDeque<GatewayError>,
    calls: u32,
}

/// In-memory gateway for tests, demos and local development.
///
/// Acknowledgements are sequential fifteen-digit numbers. A repeated key
/// returns the original acknowledgement; a repeated key with a different
/// document is rejected. Failures can be scripted ahead of calls.
#[derive(Debug, Default)]
pub struct SandboxGateway {
    state: Mutex<SandboxState>,
}

impl SandboxGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, error: GatewayError) {
        self.state.lock().scripted.push_back(error);
    }

    /// Number of `submit` calls received, including failed ones.
    pub fn calls(&self) -> u32 {
        self.state.lock().calls
    }

    /// Number of distinct submissions acknowledged.
    pub fn acknowledged(&self) -> u64 {
        self.state.lock().issued_count
    }
}

impl SubmissionGateway for SandboxGateway {
    fn submit(&self, document: &SchemaDocument, idempotency_key: &str) -> Result<AckNumber, GatewayError> {
        let mut state = self.state.lock();
        state.calls += 1;
        if let Some(error) = state.scripted.pop_front() {
            return Err(error);
        }
        if let Some((digest, ack)) = state.issued.get(idempotency_key) {
            if *digest != document.digest {
                return Err(GatewayError::Rejected {
                    reason: format!("idempotency key {idempotency_key} reused for a different document"),
                });
            }
            return Ok(ack.clone());
        }
        let ack = AckNumber::new(format!("{:015}", SANDBOX_ACK_BASE + state.issued_count + 1)).map_err(
            |e| GatewayError::Rejected {
                reason: e.to_string(),
            },
        )?;
        state.issued_count += 1;
        state
            .issued
            .insert(idempotency_key.to_string(), (document.digest, ack.clone()));
        Ok(ack)
    }
}

// ─── Fact Feeds ──────────────────────────────────────────────────────

/// What a feed needs to locate a taxpayer's statements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRequest {
    pub filing_id: FilingId,
    pub pan: Pan,
    pub assessment_year: AssessmentYear,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("fact feed {source_name} unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },
}

/// A source of facts outside the user: OCR over uploaded documents, or the
/// government's aggregated statement.
pub trait FactFeed: Send + Sync {
    /// The source every draft from this feed must carry.
    fn source(&self) -> FactSource;

    fn fetch(&self, request: &FeedRequest) -> Result<Vec<FactDraft>, FeedError>;
}

/// A feed that replays a fixed set of drafts.
#[derive(Debug, Clone)]
pub struct StaticFeed {
    source: FactSource,
    drafts: Vec<FactDraft>,
}

impl StaticFeed {
    pub fn new(source: FactSource, drafts: Vec<FactDraft>) -> Self {
        Self { source, drafts }
    }
}

impl FactFeed for StaticFeed {
    fn source(&self) -> FactSource {
        self.source
    }

    fn fetch(&self, _request: &FeedRequest) -> Result<Vec<FactDraft>, FeedError> {
        Ok(self.drafts.clone())
    }
}

// ─── Callbacks ───────────────────────────────────────────────────────

/// E-verification outcome reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationEvent {
    pub filing_id: FilingId,
    pub verified: bool,
    pub verified_at: Timestamp,
}

/// Processing completion reported by the tax department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingEvent {
    pub filing_id: FilingId,
    pub processed_at: Timestamp,
    /// Intimation reference issued with the processing outcome.
    pub intimation_ref: String,
}
