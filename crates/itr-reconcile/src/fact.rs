//! # Facts, Resolutions and Discrepancies
//!
//! A [`Fact`] is one reported value from one source. Facts are append-only:
//! a later fact for the same field never edits an earlier one, it competes
//! with it. The engine settles each field with exactly one [`Resolution`]
//! and records a [`Discrepancy`] for every fact that disagreed.

use itr_core::{FactId, FactSource, FieldId, Timestamp, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A value as submitted by a feed or a user, before it gets an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactDraft {
    pub field: FieldId,
    pub amount: Decimal,
    pub source: FactSource,
    /// Source confidence in `[0, 1]`. Required for OCR extractions;
    /// other sources default to 1.
    #[serde(default)]
    pub confidence: Option<Decimal>,
    /// Document or statement reference (Form 16 serial, AIS line).
    #[serde(default)]
    pub origin: Option<String>,
    /// When the source reported the value; defaults to receipt time.
    #[serde(default)]
    pub reported_at: Option<Timestamp>,
}

impl FactDraft {
    /// A user-entered value with full confidence.
    pub fn user_entered(field: FieldId, amount: Decimal) -> Self {
        Self {
            field,
            amount,
            source: FactSource::UserEntered,
            confidence: Some(Decimal::ONE),
            origin: None,
            reported_at: None,
        }
    }
}

/// One reported value from one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub id: FactId,
    pub field: FieldId,
    pub amount: Decimal,
    pub source: FactSource,
    pub confidence: Decimal,
    pub reported_at: Timestamp,
    pub origin: Option<String>,
}

impl Fact {
    /// Validate a draft and assign it an id.
    ///
    /// # Errors
    ///
    /// Negative amounts, confidence outside `[0, 1]` and OCR extractions
    /// without a confidence score are rejected, naming the field.
    pub fn record(draft: FactDraft, received_at: Timestamp) -> Result<Self, ValidationError> {
        let field = draft.field.to_string();
        if draft.amount < Decimal::ZERO {
            return Err(ValidationError::invalid(
                field,
                format!("amount must be non-negative, got {}", draft.amount),
            ));
        }
        let confidence = match (draft.confidence, draft.source) {
            (Some(c), _) => c,
            (None, FactSource::OcrExtracted) => {
                return Err(ValidationError::invalid(
                    field,
                    "ocr_extracted facts must carry a confidence score",
                ));
            }
            (None, _) => Decimal::ONE,
        };
        if confidence < Decimal::ZERO || confidence > Decimal::ONE {
            return Err(ValidationError::invalid(
                field,
                format!("confidence must be in [0, 1], got {confidence}"),
            ));
        }
        Ok(Self {
            id: FactId::new(),
            field: draft.field,
            amount: draft.amount,
            source: draft.source,
            confidence,
            reported_at: draft.reported_at.unwrap_or(received_at),
            origin: draft.origin,
        })
    }
}

/// How a field's accepted value was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionReason {
    /// Only one fact was reported.
    SingleSource,
    /// The accepted value is backed by agreeing facts from two or more sources.
    Consensus,
    /// No cross-source agreement; the most trusted fact won.
    HighestConfidence,
    /// A user or reviewer picked the value.
    Manual { note: String },
}

impl ResolutionReason {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleSource => "single_source",
            Self::Consensus => "consensus",
            Self::HighestConfidence => "highest_confidence",
            Self::Manual { .. } => "manual",
        }
    }
}

/// The accepted value for one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub field: FieldId,
    pub fact_id: FactId,
    pub source: FactSource,
    pub amount: Decimal,
    pub manual_override: bool,
    pub reason: ResolutionReason,
    /// `system` for automated passes, the actor id otherwise.
    pub decided_by: String,
    pub decided_at: Timestamp,
}

/// Whether a discrepancy blocks submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocking,
    Informational,
}

/// Whether a discrepancy still needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyStatus {
    Open,
    Acknowledged,
}

/// A fact that disagrees with its field's accepted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub field: FieldId,
    /// The conflicting fact.
    pub fact_id: FactId,
    pub source: FactSource,
    pub accepted_amount: Decimal,
    pub conflicting_amount: Decimal,
    /// Absolute difference between the two amounts.
    pub delta: Decimal,
    pub severity: Severity,
    pub status: DiscrepancyStatus,
}

impl Discrepancy {
    /// Open and blocking: must be resolved before the filing can be marked ready.
    pub fn is_open_blocking(&self) -> bool {
        self.severity == Severity::Blocking && self.status == DiscrepancyStatus::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itr_core::FieldCode;
    use rust_decimal_macros::dec;

    fn now() -> Timestamp {
        Timestamp::parse("2025-06-15T10:00:00Z").unwrap()
    }

    #[test]
    fn record_assigns_id_and_defaults_timestamp() {
        let draft = FactDraft::user_entered(FieldCode::SalaryIncome.into(), dec!(900000));
        let fact = Fact::record(draft, now()).unwrap();
        assert_eq!(fact.reported_at, now());
        assert_eq!(fact.confidence, dec!(1));
    }

    #[test]
    fn record_rejects_bad_values_naming_the_field() {
        let mut draft = FactDraft::user_entered(FieldCode::Section80C.into(), dec!(-1));
        let err = Fact::record(draft.clone(), now()).unwrap_err();
        assert_eq!(err.fields(), vec!["section_80c"]);

        draft.amount = dec!(10);
        draft.confidence = Some(dec!(1.2));
        assert!(Fact::record(draft, now()).is_err());
    }

    #[test]
    fn draft_deserializes_with_defaults() {
        let draft: FactDraft = serde_json::from_str(
            r#"{"field": "salary_income[TAN:BLRA12345B]", "amount": "850000", "source": "aggregated_statement"}"#,
        )
        .unwrap();
        assert_eq!(draft.confidence, None);
        assert_eq!(draft.field.instance(), Some("TAN:BLRA12345B"));
        assert_eq!(Fact::record(draft, now()).unwrap().confidence, dec!(1));
    }

    #[test]
    fn ocr_extractions_must_state_their_confidence() {
        let draft: FactDraft = serde_json::from_str(
            r#"{"field": "interest_income", "amount": "12000", "source": "ocr_extracted"}"#,
        )
        .unwrap();
        let err = Fact::record(draft.clone(), now()).unwrap_err();
        assert_eq!(err.fields(), vec!["interest_income"]);

        let scored = FactDraft {
            confidence: Some(dec!(0.7)),
            ..draft
        };
        assert_eq!(Fact::record(scored, now()).unwrap().confidence, dec!(0.7));
    }

    #[test]
    fn manual_reason_serializes_with_note() {
        let reason = ResolutionReason::Manual {
            note: "Form 16 revised".into(),
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "manual");
        assert_eq!(json["note"], "Form 16 revised");
    }
}
