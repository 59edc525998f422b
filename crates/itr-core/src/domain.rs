//! # Domain Enums
//!
//! Closed enums for the statutory vocabulary: return forms, tax regimes,
//! fact sources, who a filing is for, and the assessment year.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

// ─── Assessment Year ─────────────────────────────────────────────────

/// An assessment year such as `2025-26` (assessing income of FY 2024-25).
///
/// Always two consecutive years; the short form is the last two digits of
/// the second year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssessmentYear {
    start: u16,
}

impl AssessmentYear {
    /// Build from the first calendar year (`2025` → `2025-26`).
    pub fn from_start_year(start: u16) -> Result<Self, ValidationError> {
        if !(2000..=2099).contains(&start) {
            return Err(ValidationError::invalid(
                "assessment_year",
                format!("start year {start} out of range"),
            ));
        }
        Ok(Self { start })
    }

    /// Parse `"YYYY-YY"`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || {
            ValidationError::invalid(
                "assessment_year",
                format!("expected YYYY-YY with consecutive years, got {s:?}"),
            )
        };
        let (first, second) = s.split_once('-').ok_or_else(invalid)?;
        if first.len() != 4 || second.len() != 2 {
            return Err(invalid());
        }
        let start: u16 = first.parse().map_err(|_| invalid())?;
        let end: u16 = second.parse().map_err(|_| invalid())?;
        if (start + 1) % 100 != end {
            return Err(invalid());
        }
        Self::from_start_year(start)
    }

    /// First calendar year of the assessment year.
    pub fn start_year(&self) -> u16 {
        self.start
    }

    /// The financial (previous) year whose income is assessed, e.g. `2024-25`.
    pub fn financial_year(&self) -> String {
        format!("{}-{:02}", self.start - 1, self.start % 100)
    }

    /// The value government schemas carry in `AssessmentYear` (`"2025"`).
    pub fn schema_year(&self) -> String {
        self.start.to_string()
    }
}

impl std::fmt::Display for AssessmentYear {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.start, (self.start + 1) % 100)
    }
}

impl std::str::FromStr for AssessmentYear {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssessmentYear {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssessmentYear> for String {
    fn from(ay: AssessmentYear) -> Self {
        ay.to_string()
    }
}

// ─── ITR Type ────────────────────────────────────────────────────────

/// The statutory return form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItrType {
    /// Sahaj: salary, one house property, other sources.
    #[serde(rename = "ITR-1")]
    Itr1,
    /// Individuals/HUFs without business income.
    #[serde(rename = "ITR-2")]
    Itr2,
    /// Individuals/HUFs with business or professional income.
    #[serde(rename = "ITR-3")]
    Itr3,
    /// Sugam: presumptive business/professional income.
    #[serde(rename = "ITR-4")]
    Itr4,
    /// Firms, LLPs, AOPs, BOIs.
    #[serde(rename = "ITR-5")]
    Itr5,
    /// Companies.
    #[serde(rename = "ITR-6")]
    Itr6,
    /// Trusts and institutions.
    #[serde(rename = "ITR-7")]
    Itr7,
}

impl ItrType {
    /// Return the form name (`"ITR-1"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Itr1 => "ITR-1",
            Self::Itr2 => "ITR-2",
            Self::Itr3 => "ITR-3",
            Self::Itr4 => "ITR-4",
            Self::Itr5 => "ITR-5",
            Self::Itr6 => "ITR-6",
            Self::Itr7 => "ITR-7",
        }
    }

    /// The form's key in the government schema (`"ITR1"`).
    pub fn schema_key(&self) -> &'static str {
        match self {
            Self::Itr1 => "ITR1",
            Self::Itr2 => "ITR2",
            Self::Itr3 => "ITR3",
            Self::Itr4 => "ITR4",
            Self::Itr5 => "ITR5",
            Self::Itr6 => "ITR6",
            Self::Itr7 => "ITR7",
        }
    }

    /// Whether the form is filed by individuals/HUFs (ITR-1..ITR-4).
    pub fn is_individual_form(&self) -> bool {
        matches!(self, Self::Itr1 | Self::Itr2 | Self::Itr3 | Self::Itr4)
    }

    /// All forms in statutory order.
    pub fn all() -> &'static [ItrType] {
        &[
            Self::Itr1,
            Self::Itr2,
            Self::Itr3,
            Self::Itr4,
            Self::Itr5,
            Self::Itr6,
            Self::Itr7,
        ]
    }
}

impl std::fmt::Display for ItrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItrType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_uppercase().replace('-', "");
        Self::all()
            .iter()
            .copied()
            .find(|t| t.schema_key() == normalised)
            .ok_or_else(|| ValidationError::invalid("itr_type", format!("unknown form {s:?}")))
    }
}

// ─── Regime ──────────────────────────────────────────────────────────

/// Statutory tax computation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Exemption-heavy regime with Chapter VI-A deductions.
    Old,
    /// Lower slabs, few deductions; the statutory default.
    New,
}

impl Regime {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Old => "old",
            Self::New => "new",
        }
    }

    /// Both regimes.
    pub fn all() -> &'static [Regime] {
        &[Self::Old, Self::New]
    }
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Regime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "old" => Ok(Self::Old),
            "new" => Ok(Self::New),
            other => Err(ValidationError::invalid(
                "regime",
                format!("expected \"old\" or \"new\", got {other:?}"),
            )),
        }
    }
}

// ─── Fact Source ─────────────────────────────────────────────────────

/// Where a reported value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactSource {
    /// Typed in by the taxpayer or their CA.
    UserEntered,
    /// Extracted from an uploaded document (Form 16, bank statement).
    OcrExtracted,
    /// Regulatory feed: AIS, Form 26AS, broker statements.
    AggregatedStatement,
}

impl FactSource {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserEntered => "user_entered",
            Self::OcrExtracted => "ocr_extracted",
            Self::AggregatedStatement => "aggregated_statement",
        }
    }

    /// Tie-break rank when confidences are equal (higher wins).
    pub fn rank(&self) -> u8 {
        match self {
            Self::UserEntered => 0,
            Self::OcrExtracted => 1,
            Self::AggregatedStatement => 2,
        }
    }
}

impl std::fmt::Display for FactSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Filing For ──────────────────────────────────────────────────────

/// Legal form of a non-individual filer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Partnership firm.
    Firm,
    /// Limited liability partnership.
    Llp,
    /// Company.
    Company,
    /// Trust or charitable institution.
    Trust,
}

impl EntityKind {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Firm => "firm",
            Self::Llp => "llp",
            Self::Company => "company",
            Self::Trust => "trust",
        }
    }

    /// The form this kind of entity files.
    pub fn return_form(&self) -> ItrType {
        match self {
            Self::Firm | Self::Llp => ItrType::Itr5,
            Self::Company => ItrType::Itr6,
            Self::Trust => ItrType::Itr7,
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whom a filing is prepared for. Part of the filing uniqueness key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilingFor {
    /// The account owner.
    #[serde(rename = "self")]
    Own,
    /// A family member managed from the owner's account.
    Family {
        /// Member label, unique within the owner's account.
        member: String,
    },
    /// An entity the owner files for.
    Entity {
        /// Legal form.
        entity: EntityKind,
        /// Entity name.
        name: String,
    },
}

impl FilingFor {
    /// The entity kind, for entity filings.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            Self::Entity { entity, .. } => Some(*entity),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assessment_year_parses_and_formats() {
        let ay = AssessmentYear::parse("2025-26").unwrap();
        assert_eq!(ay.start_year(), 2025);
        assert_eq!(ay.to_string(), "2025-26");
        assert_eq!(ay.financial_year(), "2024-25");
        assert_eq!(ay.schema_year(), "2025");
    }

    #[test]
    fn assessment_year_rejects_non_consecutive() {
        assert!(AssessmentYear::parse("2025-27").is_err());
        assert!(AssessmentYear::parse("2025").is_err());
        assert!(AssessmentYear::parse("25-26").is_err());
        assert!(AssessmentYear::parse("2099-00").is_ok());
    }

    #[test]
    fn itr_type_wire_names() {
        assert_eq!(serde_json::to_string(&ItrType::Itr2).unwrap(), "\"ITR-2\"");
        assert_eq!("itr-4".parse::<ItrType>().unwrap(), ItrType::Itr4);
        assert_eq!("ITR3".parse::<ItrType>().unwrap(), ItrType::Itr3);
        assert!("ITR-9".parse::<ItrType>().is_err());
    }

    #[test]
    fn entity_kinds_map_to_entity_forms() {
        assert_eq!(EntityKind::Llp.return_form(), ItrType::Itr5);
        assert_eq!(EntityKind::Company.return_form(), ItrType::Itr6);
        assert_eq!(EntityKind::Trust.return_form(), ItrType::Itr7);
    }

    #[test]
    fn filing_for_serializes_with_kind_tag() {
        let own = serde_json::to_value(FilingFor::Own).unwrap();
        assert_eq!(own, serde_json::json!({"kind": "self"}));
        let fam: FilingFor =
            serde_json::from_value(serde_json::json!({"kind": "family", "member": "mother"}))
                .unwrap();
        assert_eq!(fam, FilingFor::Family { member: "mother".into() });
    }

    #[test]
    fn source_rank_orders_regulatory_feed_first() {
        assert!(FactSource::AggregatedStatement.rank() > FactSource::OcrExtracted.rank());
        assert!(FactSource::OcrExtracted.rank() > FactSource::UserEntered.rank());
    }
}
