//! # Reconciliation Engine
//!
//! Settles every field that has at least one fact:
//!
//! 1. Facts are grouped by [`FieldId`].
//! 2. A manual resolution already on record is kept as is.
//! 3. Otherwise facts are ordered by priority (effective confidence, source
//!    rank, latest report, fact id) and clustered: each fact joins the
//!    first cluster whose anchor it agrees with, or starts a new one. The
//!    largest cluster wins (earliest on ties) and its anchor is accepted.
//! 4. Every fact outside the winning cluster (or, for manual resolutions,
//!    every fact disagreeing with the chosen value) becomes a
//!    [`Discrepancy`].
//!
//! Automated resolutions are stamped with the latest `reported_at` of the
//! field's facts, never the wall clock, so reconciling an unchanged fact
//! set twice yields identical output.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use itr_core::{FactId, FactSource, FieldId, Timestamp, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;
use crate::fact::{
    Discrepancy, DiscrepancyStatus, Fact, Resolution, ResolutionReason, Severity,
};

/// Actor recorded on automated resolutions.
pub const SYSTEM_DECIDER: &str = "system";

/// Tolerances and thresholds for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Amounts within this many rupees agree.
    pub absolute_tolerance: Decimal,
    /// Amounts within this fraction of the larger agree.
    pub relative_tolerance: Decimal,
    /// A conflict larger than this fraction of the larger amount blocks.
    pub material_threshold: Decimal,
    /// Floor for the confidence of government-aggregated statements.
    pub aggregated_baseline: Decimal,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            absolute_tolerance: Decimal::ONE,
            relative_tolerance: Decimal::ZERO,
            material_threshold: Decimal::new(10, 2),
            aggregated_baseline: Decimal::new(95, 2),
        }
    }
}

impl ReconcileConfig {
    /// Reject negative tolerances and fractions outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.absolute_tolerance < Decimal::ZERO {
            return Err(ValidationError::invalid(
                "absolute_tolerance",
                "must be non-negative",
            ));
        }
        for (name, value) in [
            ("relative_tolerance", self.relative_tolerance),
            ("material_threshold", self.material_threshold),
            ("aggregated_baseline", self.aggregated_baseline),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(ValidationError::invalid(name, format!("{value} outside [0, 1]")));
            }
        }
        Ok(())
    }

    /// `|a - b| <= max(absolute_tolerance, relative_tolerance * max(a, b))`.
    pub fn agrees(&self, a: Decimal, b: Decimal) -> bool {
        let tolerance = self
            .absolute_tolerance
            .max(self.relative_tolerance * a.max(b));
        (a - b).abs() <= tolerance
    }

    /// Whether a conflict between `a` and `b` is material.
    pub fn is_material(&self, a: Decimal, b: Decimal) -> bool {
        (a - b).abs() > self.material_threshold * a.max(b)
    }

    /// Reported confidence, raised to the baseline for aggregated statements.
    pub fn effective_confidence(&self, fact: &Fact) -> Decimal {
        match fact.source {
            FactSource::AggregatedStatement => fact.confidence.max(self.aggregated_baseline),
            _ => fact.confidence,
        }
    }
}

/// Resolutions and discrepancies for a whole filing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub resolutions: BTreeMap<FieldId, Resolution>,
    /// Ordered by field, then fact id.
    pub discrepancies: Vec<Discrepancy>,
}

impl Reconciliation {
    /// Accepted amount per field.
    pub fn resolved_values(&self) -> BTreeMap<FieldId, Decimal> {
        self.resolutions
            .iter()
            .map(|(field, r)| (field.clone(), r.amount))
            .collect()
    }

    /// Discrepancies that still block submission.
    pub fn open_blocking(&self) -> impl Iterator<Item = &Discrepancy> {
        self.discrepancies.iter().filter(|d| d.is_open_blocking())
    }

    /// Whether any discrepancy still blocks submission.
    pub fn has_open_blocking(&self) -> bool {
        self.open_blocking().next().is_some()
    }
}

/// The reconciliation engine.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Build an engine, validating its configuration.
    pub fn new(config: ReconcileConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Re-run resolution over every field. Manual resolutions in `previous`
    /// are carried over untouched; automated ones are recomputed.
    pub fn reconcile(&self, facts: &[Fact], previous: &Reconciliation) -> Reconciliation {
        let mut by_field: BTreeMap<&FieldId, Vec<&Fact>> = BTreeMap::new();
        for fact in facts {
            by_field.entry(&fact.field).or_default().push(fact);
        }

        let mut out = Reconciliation::default();
        for (field, mut group) in by_field {
            group.sort_by_key(|f| Reverse(self.priority(f)));

            let manual = previous
                .resolutions
                .get(field)
                .filter(|r| r.manual_override && group.iter().any(|f| f.id == r.fact_id));

            let (resolution, conflicting) = match manual {
                Some(manual) => {
                    let conflicting: Vec<&Fact> = group
                        .iter()
                        .copied()
                        .filter(|f| f.id != manual.fact_id && !self.config.agrees(f.amount, manual.amount))
                        .collect();
                    (manual.clone(), conflicting)
                }
                None => self.auto_resolve(field, &group),
            };

            for fact in conflicting {
                out.discrepancies.push(self.discrepancy(&resolution, fact));
            }
            out.resolutions.insert(field.clone(), resolution);
        }
        out.discrepancies
            .sort_by(|a, b| (&a.field, a.fact_id).cmp(&(&b.field, b.fact_id)));

        tracing::info!(
            fields = out.resolutions.len(),
            discrepancies = out.discrepancies.len(),
            blocking = out.open_blocking().count(),
            "reconciliation complete"
        );
        out
    }

    /// Pin `field` to `fact_id` and re-run the engine.
    ///
    /// # Errors
    ///
    /// The fact must exist and report `field`.
    pub fn resolve_manually(
        &self,
        facts: &[Fact],
        previous: &Reconciliation,
        field: &FieldId,
        fact_id: FactId,
        decided_by: &str,
        note: String,
        decided_at: Timestamp,
    ) -> Result<Reconciliation, ReconcileError> {
        let fact = facts
            .iter()
            .find(|f| f.id == fact_id)
            .ok_or(ReconcileError::UnknownFact { fact_id })?;
        if &fact.field != field {
            return Err(ReconcileError::FieldMismatch {
                fact_id,
                field: field.clone(),
                actual: fact.field.clone(),
            });
        }

        let mut pinned = previous.clone();
        pinned.resolutions.insert(
            field.clone(),
            Resolution {
                field: field.clone(),
                fact_id,
                source: fact.source,
                amount: fact.amount,
                manual_override: true,
                reason: ResolutionReason::Manual { note },
                decided_by: decided_by.to_string(),
                decided_at,
            },
        );
        tracing::info!(%field, %fact_id, decided_by, "manual resolution recorded");
        Ok(self.reconcile(facts, &pinned))
    }

    fn priority(&self, fact: &Fact) -> (Decimal, u8, Timestamp, FactId) {
        (
            self.config.effective_confidence(fact),
            fact.source.rank(),
            fact.reported_at,
            fact.id,
        )
    }

    /// `group` is sorted by descending priority.
    fn auto_resolve<'f>(&self, field: &FieldId, group: &[&'f Fact]) -> (Resolution, Vec<&'f Fact>) {
        let mut clusters: Vec<Vec<&'f Fact>> = Vec::new();
        for &fact in group {
            match clusters
                .iter_mut()
                .find(|c| self.config.agrees(c[0].amount, fact.amount))
            {
                Some(cluster) => cluster.push(fact),
                None => clusters.push(vec![fact]),
            }
        }

        // Earliest cluster wins ties: its anchor has the higher priority.
        let mut winner = 0;
        for (i, cluster) in clusters.iter().enumerate() {
            if cluster.len() > clusters[winner].len() {
                winner = i;
            }
        }
        let winning = clusters.swap_remove(winner);
        let anchor = winning[0];

        let reason = if group.len() == 1 {
            ResolutionReason::SingleSource
        } else {
            let mut sources: Vec<FactSource> = winning.iter().map(|f| f.source).collect();
            sources.sort();
            sources.dedup();
            if sources.len() >= 2 {
                ResolutionReason::Consensus
            } else {
                ResolutionReason::HighestConfidence
            }
        };

        let decided_at = group
            .iter()
            .map(|f| f.reported_at)
            .max()
            .unwrap_or(anchor.reported_at);

        let resolution = Resolution {
            field: field.clone(),
            fact_id: anchor.id,
            source: anchor.source,
            amount: anchor.amount,
            manual_override: false,
            reason,
            decided_by: SYSTEM_DECIDER.to_string(),
            decided_at,
        };
        (resolution, clusters.into_iter().flatten().collect())
    }

    fn discrepancy(&self, resolution: &Resolution, fact: &Fact) -> Discrepancy {
        let (severity, status) = if resolution.manual_override {
            (Severity::Informational, DiscrepancyStatus::Acknowledged)
        } else if self.config.is_material(resolution.amount, fact.amount) {
            (Severity::Blocking, DiscrepancyStatus::Open)
        } else {
            (Severity::Informational, DiscrepancyStatus::Open)
        };
        Discrepancy {
            field: resolution.field.clone(),
            fact_id: fact.id,
            source: fact.source,
            accepted_amount: resolution.amount,
            conflicting_amount: fact.amount,
            delta: (resolution.amount - fact.amount).abs(),
            severity,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::FactDraft;
    use itr_core::FieldCode;
    use rust_decimal_macros::dec;

    fn at(secs: u32) -> Timestamp {
        Timestamp::parse(&format!("2025-06-15T10:00:{secs:02}Z")).unwrap()
    }

    fn fact(code: FieldCode, amount: Decimal, source: FactSource, confidence: Decimal, secs: u32) -> Fact {
        Fact::record(
            FactDraft {
                field: code.into(),
                amount,
                source,
                confidence: Some(confidence),
                origin: None,
                reported_at: Some(at(secs)),
            },
            at(59),
        )
        .unwrap()
    }

    fn two_percent() -> Reconciler {
        Reconciler::new(ReconcileConfig {
            relative_tolerance: dec!(0.02),
            ..ReconcileConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn single_fact_is_accepted_as_single_source() {
        let f = fact(FieldCode::SalaryIncome, dec!(900000), FactSource::UserEntered, dec!(1), 0);
        let out = Reconciler::default().reconcile(&[f.clone()], &Reconciliation::default());
        let r = &out.resolutions[&f.field];
        assert_eq!(r.fact_id, f.id);
        assert_eq!(r.reason, ResolutionReason::SingleSource);
        assert_eq!(r.decided_by, SYSTEM_DECIDER);
        assert!(out.discrepancies.is_empty());
    }

    #[test]
    fn agreeing_pair_beats_outlier_and_outlier_blocks() {
        let a = fact(FieldCode::InterestIncome, dec!(100), FactSource::UserEntered, dec!(0.7), 0);
        let b = fact(FieldCode::InterestIncome, dec!(101), FactSource::OcrExtracted, dec!(0.9), 1);
        let c = fact(FieldCode::InterestIncome, dec!(5000), FactSource::OcrExtracted, dec!(0.99), 2);
        let out = two_percent().reconcile(&[a, b.clone(), c.clone()], &Reconciliation::default());

        let r = &out.resolutions[&b.field];
        assert_eq!(r.fact_id, b.id);
        assert_eq!(r.amount, dec!(101));
        assert_eq!(r.reason, ResolutionReason::Consensus);

        assert_eq!(out.discrepancies.len(), 1);
        let d = &out.discrepancies[0];
        assert_eq!(d.fact_id, c.id);
        assert_eq!(d.delta, dec!(4899));
        assert_eq!(d.severity, Severity::Blocking);
        assert!(out.has_open_blocking());
    }

    #[test]
    fn small_conflict_is_informational() {
        let a = fact(FieldCode::DividendIncome, dec!(1000), FactSource::UserEntered, dec!(1), 0);
        let b = fact(FieldCode::DividendIncome, dec!(1050), FactSource::AggregatedStatement, dec!(0.5), 1);
        let out = Reconciler::default().reconcile(&[a, b.clone()], &Reconciliation::default());
        // Aggregated confidence is raised to 0.95 but user entry at 1.0 still leads.
        let r = out.resolutions.values().next().unwrap();
        assert_eq!(r.amount, dec!(1000));
        assert_eq!(r.reason, ResolutionReason::HighestConfidence);
        assert_eq!(out.discrepancies[0].fact_id, b.id);
        assert_eq!(out.discrepancies[0].severity, Severity::Informational);
        assert!(!out.has_open_blocking());
    }

    #[test]
    fn aggregated_statement_baseline_outranks_ocr() {
        let ocr = fact(FieldCode::TdsSalary, dec!(50000), FactSource::OcrExtracted, dec!(0.9), 0);
        let ais = fact(FieldCode::TdsSalary, dec!(52000), FactSource::AggregatedStatement, dec!(0.6), 0);
        let out = Reconciler::default().reconcile(&[ocr, ais.clone()], &Reconciliation::default());
        assert_eq!(out.resolutions[&ais.field].fact_id, ais.id);
    }

    #[test]
    fn confidence_ties_break_on_source_rank() {
        let user = fact(FieldCode::Section80D, dec!(20000), FactSource::UserEntered, dec!(0.95), 5);
        let ais = fact(FieldCode::Section80D, dec!(25000), FactSource::AggregatedStatement, dec!(0.95), 0);
        let out = Reconciler::default().reconcile(&[user, ais.clone()], &Reconciliation::default());
        assert_eq!(out.resolutions[&ais.field].fact_id, ais.id);
    }

    #[test]
    fn automated_resolution_is_stamped_with_latest_report() {
        let a = fact(FieldCode::SalaryIncome, dec!(10), FactSource::UserEntered, dec!(1), 3);
        let b = fact(FieldCode::SalaryIncome, dec!(10), FactSource::OcrExtracted, dec!(0.5), 7);
        let out = Reconciler::default().reconcile(&[a, b], &Reconciliation::default());
        assert_eq!(out.resolutions.values().next().unwrap().decided_at, at(7));
    }

    #[test]
    fn manual_resolution_wins_and_acknowledges() {
        let a = fact(FieldCode::InterestIncome, dec!(100), FactSource::UserEntered, dec!(0.7), 0);
        let b = fact(FieldCode::InterestIncome, dec!(101), FactSource::OcrExtracted, dec!(0.9), 1);
        let c = fact(FieldCode::InterestIncome, dec!(5000), FactSource::OcrExtracted, dec!(0.99), 2);
        let facts = vec![a.clone(), b, c.clone()];
        let engine = two_percent();
        let first = engine.reconcile(&facts, &Reconciliation::default());

        let pinned = engine
            .resolve_manually(&facts, &first, &c.field, c.id, "owner:1", "bank statement".into(), at(30))
            .unwrap();
        let r = &pinned.resolutions[&c.field];
        assert!(r.manual_override);
        assert_eq!(r.amount, dec!(5000));
        assert_eq!(pinned.discrepancies.len(), 2);
        assert!(pinned
            .discrepancies
            .iter()
            .all(|d| d.status == DiscrepancyStatus::Acknowledged && d.severity == Severity::Informational));

        // A later automated pass never replaces it.
        let rerun = engine.reconcile(&facts, &pinned);
        assert_eq!(rerun, pinned);
        assert_eq!(rerun.resolutions[&a.field].fact_id, c.id);
    }

    #[test]
    fn manual_resolution_requires_matching_fact() {
        let a = fact(FieldCode::InterestIncome, dec!(100), FactSource::UserEntered, dec!(1), 0);
        let b = fact(FieldCode::SalaryIncome, dec!(100), FactSource::UserEntered, dec!(1), 0);
        let facts = vec![a.clone(), b.clone()];
        let engine = Reconciler::default();
        let state = engine.reconcile(&facts, &Reconciliation::default());

        assert!(matches!(
            engine.resolve_manually(&facts, &state, &a.field, FactId::new(), "x", String::new(), at(0)),
            Err(ReconcileError::UnknownFact { .. })
        ));
        assert!(matches!(
            engine.resolve_manually(&facts, &state, &a.field, b.id, "x", String::new(), at(0)),
            Err(ReconcileError::FieldMismatch { .. })
        ));
    }

    #[test]
    fn instances_are_reconciled_independently() {
        let e1 = FieldId::with_instance(FieldCode::SalaryIncome, "TAN:A").unwrap();
        let e2 = FieldId::with_instance(FieldCode::SalaryIncome, "TAN:B").unwrap();
        let mk = |field: &FieldId, amount| {
            Fact::record(FactDraft::user_entered(field.clone(), amount), at(0)).unwrap()
        };
        let facts = vec![mk(&e1, dec!(400000)), mk(&e2, dec!(300000))];
        let out = Reconciler::default().reconcile(&facts, &Reconciliation::default());
        assert_eq!(out.resolutions.len(), 2);
        assert!(out.discrepancies.is_empty());
    }

    #[test]
    fn config_validation() {
        assert!(ReconcileConfig::default().validate().is_ok());
        let bad = ReconcileConfig {
            material_threshold: dec!(1.5),
            ..ReconcileConfig::default()
        };
        assert_eq!(bad.validate().unwrap_err().fields(), vec!["material_threshold"]);
        assert!(ReconcileConfig::default().agrees(dec!(100), dec!(101)));
        assert!(!ReconcileConfig::default().agrees(dec!(100), dec!(102)));
    }
}
