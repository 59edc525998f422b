//! # Statutory Tables
//!
//! Slab rates, rebate limits, surcharge tiers, cess and the deductions each
//! regime allows change with every Finance Act. They are configuration
//! keyed by [`AssessmentYear`], loaded from YAML and validated on load, never
//! constants in the calculator.
//!
//! Two years ship built in (`tables/2024-25.yaml`, `tables/2025-26.yaml`).
//! A directory of `*.yaml` files replaces the built-in set when
//! `ITR_TABLES_DIR` is configured.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use itr_core::{AssessmentYear, DeductionSection, Regime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TaxError;

const BUILTIN: &[(&str, &str)] = &[
    ("2024-25", include_str!("../tables/2024-25.yaml")),
    ("2025-26", include_str!("../tables/2025-26.yaml")),
];

/// One progressive slab. `to = None` marks the open-ended top slab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slab {
    /// Lower bound, exclusive of the income taxed by lower slabs.
    pub from: Decimal,
    /// Upper bound, or `None` for the top slab.
    #[serde(default)]
    pub to: Option<Decimal>,
    /// Marginal rate as a fraction.
    pub rate: Decimal,
}

/// Section 87A rebate parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebateRule {
    /// Taxable income at or below which the rebate applies in full.
    pub income_ceiling: Decimal,
    /// Largest rebate granted.
    pub max_rebate: Decimal,
    /// Whether tax just above the ceiling is capped at the excess income.
    #[serde(default)]
    pub marginal_relief: bool,
}

/// A surcharge tier: `rate` applies once taxable income exceeds `threshold`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurchargeTier {
    /// Income above which this tier applies.
    pub threshold: Decimal,
    /// Surcharge as a fraction of income tax.
    pub rate: Decimal,
}

/// Everything the calculator needs for one regime in one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeTable {
    /// Progressive slabs, ascending and contiguous from zero.
    pub slabs: Vec<Slab>,
    /// Rebate u/s 87A.
    pub rebate: RebateRule,
    /// Surcharge tiers, ascending by threshold.
    #[serde(default)]
    pub surcharge: Vec<SurchargeTier>,
    /// Sections claimable under this regime with their caps. `None` is
    /// uncapped; a section absent from the map is disallowed.
    pub deductions: BTreeMap<DeductionSection, Option<Decimal>>,
}

impl RegimeTable {
    /// Whether the regime recognises `section` at all.
    pub fn allows(&self, section: DeductionSection) -> bool {
        self.deductions.contains_key(&section)
    }

    /// The cap on `section`, if it is allowed and capped.
    pub fn cap(&self, section: DeductionSection) -> Option<Decimal> {
        self.deductions.get(&section).copied().flatten()
    }

    /// Progressive tax on `income` under this table's slabs.
    pub fn slab_tax(&self, income: Decimal) -> Decimal {
        self.slabs
            .iter()
            .map(|slab| {
                let upper = slab.to.map_or(income, |to| income.min(to));
                (upper - slab.from).max(Decimal::ZERO) * slab.rate
            })
            .sum()
    }

    fn validate(&self, year: AssessmentYear, regime: Regime) -> Result<(), TaxError> {
        let invalid = |section: String, reason: String| TaxError::InvalidTable {
            year,
            section,
            reason,
        };
        let name = regime.as_str();

        let Some(first) = self.slabs.first() else {
            return Err(invalid(format!("{name}.slabs"), "at least one slab is required".into()));
        };
        if !first.from.is_zero() {
            return Err(invalid(format!("{name}.slabs[0]"), "first slab must start at 0".into()));
        }
        for (i, slab) in self.slabs.iter().enumerate() {
            let at = format!("{name}.slabs[{i}]");
            if !is_fraction(slab.rate) {
                return Err(invalid(at, format!("rate {} outside [0, 1]", slab.rate)));
            }
            let last = i + 1 == self.slabs.len();
            match (slab.to, last) {
                (None, true) => {}
                (None, false) => {
                    return Err(invalid(at, "only the top slab may be open-ended".into()))
                }
                (Some(_), true) => {
                    return Err(invalid(at, "top slab must be open-ended".into()))
                }
                (Some(to), false) => {
                    if to <= slab.from {
                        return Err(invalid(at, format!("upper bound {to} not above {}", slab.from)));
                    }
                    if self.slabs[i + 1].from != to {
                        return Err(invalid(at, format!("gap or overlap after {to}")));
                    }
                }
            }
        }

        if self.rebate.income_ceiling.is_sign_negative() || self.rebate.max_rebate.is_sign_negative() {
            return Err(invalid(format!("{name}.rebate"), "amounts must be non-negative".into()));
        }

        let mut previous: Option<&SurchargeTier> = None;
        for (i, tier) in self.surcharge.iter().enumerate() {
            let at = format!("{name}.surcharge[{i}]");
            if !is_fraction(tier.rate) {
                return Err(invalid(at, format!("rate {} outside [0, 1]", tier.rate)));
            }
            if let Some(prev) = previous {
                if tier.threshold <= prev.threshold {
                    return Err(invalid(at, "thresholds must be strictly ascending".into()));
                }
            }
            previous = Some(tier);
        }

        for (section, cap) in &self.deductions {
            if cap.is_some_and(|c| c.is_sign_negative()) {
                return Err(invalid(
                    format!("{name}.deductions.{section}"),
                    "cap must be non-negative".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Statutory tables for one assessment year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatutoryTables {
    /// The year these tables govern.
    pub assessment_year: AssessmentYear,
    /// Health and education cess as a fraction.
    pub cess_rate: Decimal,
    /// Old (exemption-heavy) regime.
    pub old: RegimeTable,
    /// New (default) regime.
    pub new: RegimeTable,
}

impl StatutoryTables {
    /// Parse and validate one YAML document.
    pub fn from_yaml_str(source_name: &str, yaml: &str) -> Result<Self, TaxError> {
        let tables: Self = serde_yaml::from_str(yaml).map_err(|e| TaxError::Parse {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;
        tables.validate()?;
        Ok(tables)
    }

    /// The table for `regime`.
    pub fn regime(&self, regime: Regime) -> &RegimeTable {
        match regime {
            Regime::Old => &self.old,
            Regime::New => &self.new,
        }
    }

    /// Check slab contiguity, rate ranges and tier ordering.
    pub fn validate(&self) -> Result<(), TaxError> {
        if !is_fraction(self.cess_rate) {
            return Err(TaxError::InvalidTable {
                year: self.assessment_year,
                section: "cess_rate".into(),
                reason: format!("rate {} outside [0, 1]", self.cess_rate),
            });
        }
        self.old.validate(self.assessment_year, Regime::Old)?;
        self.new.validate(self.assessment_year, Regime::New)
    }
}

fn is_fraction(rate: Decimal) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE
}

/// Lookup collaborator for statutory tables.
pub trait TableProvider: Send + Sync {
    /// Tables for `year`, or [`TaxError::UnknownYear`].
    fn tables(&self, year: AssessmentYear) -> Result<Arc<StatutoryTables>, TaxError>;

    /// Every configured year, ascending.
    fn years(&self) -> Vec<AssessmentYear>;
}

/// An in-memory set of validated tables keyed by year.
#[derive(Debug, Clone, Default)]
pub struct TableSet {
    by_year: BTreeMap<AssessmentYear, Arc<StatutoryTables>>,
}

impl TableSet {
    /// The tables compiled into the binary.
    pub fn builtin() -> Result<Self, TaxError> {
        let mut set = Self::default();
        for (year, yaml) in BUILTIN {
            set.insert(StatutoryTables::from_yaml_str(&format!("builtin:{year}"), yaml)?)?;
        }
        Ok(set)
    }

    /// Load every `*.yaml`/`*.yml` file in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TaxError> {
        let mut paths: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .collect();
        paths.sort();

        let mut set = Self::default();
        for path in paths {
            let yaml = std::fs::read_to_string(&path)?;
            let tables = StatutoryTables::from_yaml_str(&path.display().to_string(), &yaml)?;
            tracing::debug!(year = %tables.assessment_year, path = %path.display(), "loaded statutory tables");
            set.insert(tables)?;
        }
        Ok(set)
    }

    /// Add one year's tables, rejecting duplicates.
    pub fn insert(&mut self, tables: StatutoryTables) -> Result<(), TaxError> {
        let year = tables.assessment_year;
        if self.by_year.contains_key(&year) {
            return Err(TaxError::DuplicateYear { year });
        }
        self.by_year.insert(year, Arc::new(tables));
        Ok(())
    }
}

impl TableProvider for TableSet {
    fn tables(&self, year: AssessmentYear) -> Result<Arc<StatutoryTables>, TaxError> {
        self.by_year
            .get(&year)
            .cloned()
            .ok_or(TaxError::UnknownYear { year })
    }

    fn years(&self) -> Vec<AssessmentYear> {
        self.by_year.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ay(s: &str) -> AssessmentYear {
        AssessmentYear::parse(s).unwrap()
    }

    #[test]
    fn builtin_tables_load_and_validate() {
        let set = TableSet::builtin().unwrap();
        assert_eq!(set.years(), vec![ay("2024-25"), ay("2025-26")]);
        let t = set.tables(ay("2025-26")).unwrap();
        assert_eq!(t.cess_rate, dec!(0.04));
        assert_eq!(t.new.cap(DeductionSection::StandardDeduction), Some(dec!(75000)));
        assert!(!t.new.allows(DeductionSection::Sec80C));
        assert!(t.new.allows(DeductionSection::Sec80CCD2));
        assert_eq!(t.old.cap(DeductionSection::Sec80C), Some(dec!(150000)));
        assert!(t.old.allows(DeductionSection::Sec80E));
        assert_eq!(t.old.cap(DeductionSection::Sec80E), None);
    }

    #[test]
    fn new_regime_slabs_differ_between_years() {
        let set = TableSet::builtin().unwrap();
        let older = set.tables(ay("2024-25")).unwrap();
        let newer = set.tables(ay("2025-26")).unwrap();
        // 6,50,000: AY24-25 taxes 50k at 10%; AY25-26 keeps it in the 5% slab.
        assert_eq!(older.new.slab_tax(dec!(650000)), dec!(20000));
        assert_eq!(newer.new.slab_tax(dec!(650000)), dec!(17500));
        assert_eq!(older.new.cap(DeductionSection::StandardDeduction), Some(dec!(50000)));
    }

    #[test]
    fn old_regime_slab_tax() {
        let set = TableSet::builtin().unwrap();
        let t = set.tables(ay("2025-26")).unwrap();
        assert_eq!(t.old.slab_tax(dec!(0)), dec!(0));
        assert_eq!(t.old.slab_tax(dec!(280000)), dec!(1500));
        assert_eq!(t.old.slab_tax(dec!(1000000)), dec!(112500));
        assert_eq!(t.old.slab_tax(dec!(1200000)), dec!(172500));
    }

    #[test]
    fn unknown_year_is_an_error() {
        let set = TableSet::builtin().unwrap();
        assert!(matches!(
            set.tables(ay("2019-20")),
            Err(TaxError::UnknownYear { .. })
        ));
    }

    #[test]
    fn gap_between_slabs_is_rejected() {
        let yaml = BUILTIN[1].1.replace(
            r#"{ from: "250000", to: "500000", rate: "0.05" }"#,
            r#"{ from: "260000", to: "500000", rate: "0.05" }"#,
        );
        let err = StatutoryTables::from_yaml_str("test", &yaml).unwrap_err();
        assert!(matches!(err, TaxError::InvalidTable { ref section, .. } if section == "old.slabs[0]"));
    }

    #[test]
    fn out_of_range_rate_is_rejected() {
        let yaml = BUILTIN[1].1.replace(r#"cess_rate: "0.04""#, r#"cess_rate: "4""#);
        assert!(matches!(
            StatutoryTables::from_yaml_str("test", &yaml),
            Err(TaxError::InvalidTable { .. })
        ));
    }

    #[test]
    fn descending_surcharge_is_rejected() {
        let yaml = BUILTIN[1].1.replace(
            r#"{ threshold: "10000000", rate: "0.15" }"#,
            r#"{ threshold: "4000000", rate: "0.15" }"#,
        );
        assert!(StatutoryTables::from_yaml_str("test", &yaml).is_err());
    }

    #[test]
    fn directory_loading_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yaml"), BUILTIN[1].1).unwrap();
        let set = TableSet::from_dir(dir.path()).unwrap();
        assert_eq!(set.years(), vec![ay("2025-26")]);

        std::fs::write(dir.path().join("b.yml"), BUILTIN[1].1).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        assert!(matches!(
            TableSet::from_dir(dir.path()),
            Err(TaxError::DuplicateYear { .. })
        ));
    }
}
