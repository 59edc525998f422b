//! # Input Files
//!
//! Every subcommand except `tables` reads a facts file: the reported
//! values for one return plus the header fields the command needs.
//! JSON (`.json`) and YAML (anything else) are accepted:
//!
//! ```yaml
//! pan: ABCPE1234F
//! assessment_year: 2025-26
//! itr_type: ITR-1
//! regime: new
//! facts:
//!   - field: salary_income[TAN:BLRA12345B]
//!     amount: "850000"
//!     source: user_entered
//!   - field: salary_income[TAN:BLRA12345B]
//!     amount: "850000"
//!     source: aggregated_statement
//!     origin: AIS
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use itr_core::{AckNumber, AssessmentYear, FilingFor, ItrType, Pan, Regime, Timestamp};
use itr_reconcile::{Fact, FactDraft, Reconciler, Reconciliation};
use itr_tax::{StatutoryTables, TableProvider, TableSet};
use serde::Deserialize;

/// Reported values for one return.
#[derive(Debug, Clone, Deserialize)]
pub struct FactsFile {
    #[serde(default)]
    pub pan: Option<Pan>,
    pub assessment_year: AssessmentYear,
    #[serde(default)]
    pub itr_type: Option<ItrType>,
    #[serde(default)]
    pub filing_for: Option<FilingFor>,
    #[serde(default)]
    pub regime: Option<Regime>,
    /// Acknowledgement of the original return when this one revises it.
    #[serde(default)]
    pub original_ack: Option<AckNumber>,
    #[serde(default)]
    pub facts: Vec<FactDraft>,
}

impl FactsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("failed to read facts file: {}", path.display()))?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        if is_json {
            serde_json::from_str(&content).with_context(|| format!("failed to parse facts JSON: {}", path.display()))
        } else {
            serde_yaml::from_str(&content).with_context(|| format!("failed to parse facts YAML: {}", path.display()))
        }
    }

    pub fn filing_for(&self) -> FilingFor {
        self.filing_for.clone().unwrap_or(FilingFor::Own)
    }

    /// Record every draft and settle each field.
    pub fn reconcile(&self, reconciler: &Reconciler) -> Result<Reconciliation> {
        let now = Timestamp::now();
        let facts = self
            .facts
            .iter()
            .enumerate()
            .map(|(i, draft)| Fact::record(draft.clone(), now).with_context(|| format!("fact #{} ({})", i + 1, draft.field)))
            .collect::<Result<Vec<_>>>()?;
        let reconciliation = reconciler.reconcile(&facts, &Reconciliation::default());
        for d in reconciliation.open_blocking() {
            tracing::warn!(
                field = %d.field,
                accepted = %d.accepted_amount,
                conflicting = %d.conflicting_amount,
                source = %d.source,
                "blocking discrepancy"
            );
        }
        Ok(reconciliation)
    }
}

/// Where statutory tables come from.
#[derive(Args, Debug, Clone, Default)]
pub struct TablesSource {
    /// Directory of per-year statutory table YAML files. Defaults to the
    /// built-in tables.
    #[arg(long, env = "ITR_TABLES_DIR", global = true)]
    pub tables_dir: Option<PathBuf>,
}

impl TablesSource {
    pub fn load(&self) -> Result<TableSet> {
        match &self.tables_dir {
            Some(dir) => TableSet::from_dir(dir)
                .with_context(|| format!("failed to load statutory tables from {}", dir.display())),
            None => TableSet::builtin().context("built-in statutory tables are invalid"),
        }
    }

    pub fn for_year(&self, year: AssessmentYear) -> Result<Arc<StatutoryTables>> {
        Ok(self.load()?.tables(year)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itr_core::{FieldCode, FieldId};

    #[test]
    fn yaml_and_json_files_load() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("facts.yaml");
        std::fs::write(
            &yaml,
            "assessment_year: 2025-26\nfacts:\n  - field: salary_income\n    amount: \"600000\"\n    source: user_entered\n",
        )
        .unwrap();
        let json = dir.path().join("facts.json");
        std::fs::write(
            &json,
            r#"{"assessment_year": "2025-26", "regime": "old", "facts": [{"field": "interest_income", "amount": "1200", "source": "ocr_extracted", "confidence": "0.8"}]}"#,
        )
        .unwrap();

        let from_yaml = FactsFile::load(&yaml).unwrap();
        assert_eq!(from_yaml.facts[0].field, FieldId::new(FieldCode::SalaryIncome));
        assert_eq!(from_yaml.filing_for(), FilingFor::Own);
        let from_json = FactsFile::load(&json).unwrap();
        assert_eq!(from_json.regime, Some(Regime::Old));
    }

    #[test]
    fn malformed_fact_names_its_position() {
        let file = FactsFile {
            pan: None,
            assessment_year: AssessmentYear::parse("2025-26").unwrap(),
            itr_type: None,
            filing_for: None,
            regime: None,
            original_ack: None,
            facts: vec![FactDraft::user_entered(
                FieldId::new(FieldCode::SalaryIncome),
                rust_decimal::Decimal::NEGATIVE_ONE,
            )],
        };
        let err = file.reconcile(&Reconciler::default()).unwrap_err();
        assert!(format!("{err:#}").contains("fact #1"));
    }

    #[test]
    fn unknown_year_is_reported() {
        let source = TablesSource::default();
        assert!(source.for_year(AssessmentYear::parse("2040-41").unwrap()).is_err());
    }
}
