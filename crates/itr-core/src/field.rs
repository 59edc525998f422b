//! # Field Catalogue
//!
//! Every value the engine reconciles is identified by a [`FieldId`]: a
//! [`FieldCode`] from the closed catalogue below plus an optional instance
//! qualifier distinguishing repeated entries (one per employer, one per
//! property, one per insurer).
//!
//! ```text
//! salary_income                    single employer
//! salary_income[TAN:BLRA12345B]    one of several employers
//! house_property_income[2]         second property
//! ```
//!
//! Each code knows its kind, its income category or deduction section, and
//! the label it carries in government schedules, so the recommender, the
//! calculator input mapping and the schema builder all derive from one table.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What role a field plays in the computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Part of gross total income.
    Income,
    /// Reported but exempt (agricultural income).
    ExemptIncome,
    /// Disclosure only (foreign asset values); never taxed directly.
    Disclosure,
    /// Reduces gross total income, subject to regime and section caps.
    Deduction,
    /// Tax already deducted or paid, credited against liability.
    TaxPaid,
}

/// Income-source categories the ITR type recommender reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeCategory {
    /// Salary or pension.
    Salary,
    /// Income from house property.
    HouseProperty,
    /// Interest, dividends and other residual income.
    OtherSources,
    /// Exempt agricultural income.
    Agricultural,
    /// Short- or long-term capital gains.
    CapitalGains,
    /// Assets held outside India.
    ForeignAssets,
    /// Regular business or professional income (books of account).
    Business,
    /// Presumptive income under sections 44AD/44ADA.
    Presumptive,
}

impl IncomeCategory {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::HouseProperty => "house_property",
            Self::OtherSources => "other_sources",
            Self::Agricultural => "agricultural",
            Self::CapitalGains => "capital_gains",
            Self::ForeignAssets => "foreign_assets",
            Self::Business => "business",
            Self::Presumptive => "presumptive",
        }
    }
}

impl std::fmt::Display for IncomeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deduction sections recognised by the calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DeductionSection {
    /// Section 16(ia) standard deduction for salaried taxpayers.
    #[serde(rename = "standard_deduction")]
    StandardDeduction,
    /// Life insurance, PPF, ELSS, tuition fees.
    #[serde(rename = "80c")]
    Sec80C,
    /// Own NPS contribution over and above 80C.
    #[serde(rename = "80ccd_1b")]
    Sec80CCD1B,
    /// Employer NPS contribution.
    #[serde(rename = "80ccd_2")]
    Sec80CCD2,
    /// Health insurance premium.
    #[serde(rename = "80d")]
    Sec80D,
    /// Education loan interest.
    #[serde(rename = "80e")]
    Sec80E,
    /// Donations.
    #[serde(rename = "80g")]
    Sec80G,
    /// Savings account interest.
    #[serde(rename = "80tta")]
    Sec80TTA,
}

impl DeductionSection {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StandardDeduction => "standard_deduction",
            Self::Sec80C => "80c",
            Self::Sec80CCD1B => "80ccd_1b",
            Self::Sec80CCD2 => "80ccd_2",
            Self::Sec80D => "80d",
            Self::Sec80E => "80e",
            Self::Sec80G => "80g",
            Self::Sec80TTA => "80tta",
        }
    }

    /// Whether the section belongs to Chapter VI-A.
    pub fn is_chapter_via(&self) -> bool {
        !matches!(self, Self::StandardDeduction)
    }

    /// All sections in catalogue order.
    pub fn all() -> &'static [DeductionSection] {
        &[
            Self::StandardDeduction,
            Self::Sec80C,
            Self::Sec80CCD1B,
            Self::Sec80CCD2,
            Self::Sec80D,
            Self::Sec80E,
            Self::Sec80G,
            Self::Sec80TTA,
        ]
    }
}

impl std::fmt::Display for DeductionSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed catalogue of reconciled values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCode {
    SalaryIncome,
    HousePropertyIncome,
    InterestIncome,
    DividendIncome,
    OtherSourcesIncome,
    AgriculturalIncome,
    ShortTermCapitalGains,
    LongTermCapitalGains,
    ForeignAssetValue,
    BusinessIncome,
    PresumptiveBusinessIncome,
    PresumptiveProfessionalIncome,
    StandardDeduction,
    #[serde(rename = "section_80c")]
    Section80C,
    #[serde(rename = "section_80ccd_1b")]
    Section80CCD1B,
    #[serde(rename = "section_80ccd_2")]
    Section80CCD2,
    #[serde(rename = "section_80d")]
    Section80D,
    #[serde(rename = "section_80e")]
    Section80E,
    #[serde(rename = "section_80g")]
    Section80G,
    #[serde(rename = "section_80tta")]
    Section80TTA,
    TdsSalary,
    TdsOther,
    AdvanceTax,
    SelfAssessmentTax,
}

impl FieldCode {
    /// Return the catalogue identifier (`"salary_income"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SalaryIncome => "salary_income",
            Self::HousePropertyIncome => "house_property_income",
            Self::InterestIncome => "interest_income",
            Self::DividendIncome => "dividend_income",
            Self::OtherSourcesIncome => "other_sources_income",
            Self::AgriculturalIncome => "agricultural_income",
            Self::ShortTermCapitalGains => "short_term_capital_gains",
            Self::LongTermCapitalGains => "long_term_capital_gains",
            Self::ForeignAssetValue => "foreign_asset_value",
            Self::BusinessIncome => "business_income",
            Self::PresumptiveBusinessIncome => "presumptive_business_income",
            Self::PresumptiveProfessionalIncome => "presumptive_professional_income",
            Self::StandardDeduction => "standard_deduction",
            Self::Section80C => "section_80c",
            Self::Section80CCD1B => "section_80ccd_1b",
            Self::Section80CCD2 => "section_80ccd_2",
            Self::Section80D => "section_80d",
            Self::Section80E => "section_80e",
            Self::Section80G => "section_80g",
            Self::Section80TTA => "section_80tta",
            Self::TdsSalary => "tds_salary",
            Self::TdsOther => "tds_other",
            Self::AdvanceTax => "advance_tax",
            Self::SelfAssessmentTax => "self_assessment_tax",
        }
    }

    /// The label this value carries in government schedule line items.
    pub fn schema_label(&self) -> &'static str {
        match self {
            Self::SalaryIncome => "GrossSalary",
            Self::HousePropertyIncome => "IncomeOfHP",
            Self::InterestIncome => "IntrstIncome",
            Self::DividendIncome => "DividendIncome",
            Self::OtherSourcesIncome => "OthersInc",
            Self::AgriculturalIncome => "AgriIncome",
            Self::ShortTermCapitalGains => "ShortTermCapGain",
            Self::LongTermCapitalGains => "LongTermCapGain",
            Self::ForeignAssetValue => "ForeignAssetValue",
            Self::BusinessIncome => "NetProfitBP",
            Self::PresumptiveBusinessIncome => "PresumpIncDeemed44AD",
            Self::PresumptiveProfessionalIncome => "PresumpIncDeemed44ADA",
            Self::StandardDeduction => "DeductionUs16ia",
            Self::Section80C => "Section80C",
            Self::Section80CCD1B => "Section80CCD1B",
            Self::Section80CCD2 => "Section80CCDEmployer",
            Self::Section80D => "Section80D",
            Self::Section80E => "Section80E",
            Self::Section80G => "Section80G",
            Self::Section80TTA => "Section80TTA",
            Self::TdsSalary => "TDSonSalary",
            Self::TdsOther => "TDSonOthThanSal",
            Self::AdvanceTax => "AdvanceTax",
            Self::SelfAssessmentTax => "SelfAssessmentTax",
        }
    }

    /// Reverse lookup from a schedule label.
    pub fn from_schema_label(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.schema_label() == label)
    }

    /// The field's role in the computation.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::AgriculturalIncome => FieldKind::ExemptIncome,
            Self::ForeignAssetValue => FieldKind::Disclosure,
            Self::StandardDeduction
            | Self::Section80C
            | Self::Section80CCD1B
            | Self::Section80CCD2
            | Self::Section80D
            | Self::Section80E
            | Self::Section80G
            | Self::Section80TTA => FieldKind::Deduction,
            Self::TdsSalary | Self::TdsOther | Self::AdvanceTax | Self::SelfAssessmentTax => {
                FieldKind::TaxPaid
            }
            _ => FieldKind::Income,
        }
    }

    /// The income category, for income, exempt-income and disclosure fields.
    pub fn income_category(&self) -> Option<IncomeCategory> {
        match self {
            Self::SalaryIncome => Some(IncomeCategory::Salary),
            Self::HousePropertyIncome => Some(IncomeCategory::HouseProperty),
            Self::InterestIncome | Self::DividendIncome | Self::OtherSourcesIncome => {
                Some(IncomeCategory::OtherSources)
            }
            Self::AgriculturalIncome => Some(IncomeCategory::Agricultural),
            Self::ShortTermCapitalGains | Self::LongTermCapitalGains => {
                Some(IncomeCategory::CapitalGains)
            }
            Self::ForeignAssetValue => Some(IncomeCategory::ForeignAssets),
            Self::BusinessIncome => Some(IncomeCategory::Business),
            Self::PresumptiveBusinessIncome | Self::PresumptiveProfessionalIncome => {
                Some(IncomeCategory::Presumptive)
            }
            _ => None,
        }
    }

    /// The deduction section, for deduction fields.
    pub fn deduction_section(&self) -> Option<DeductionSection> {
        match self {
            Self::StandardDeduction => Some(DeductionSection::StandardDeduction),
            Self::Section80C => Some(DeductionSection::Sec80C),
            Self::Section80CCD1B => Some(DeductionSection::Sec80CCD1B),
            Self::Section80CCD2 => Some(DeductionSection::Sec80CCD2),
            Self::Section80D => Some(DeductionSection::Sec80D),
            Self::Section80E => Some(DeductionSection::Sec80E),
            Self::Section80G => Some(DeductionSection::Sec80G),
            Self::Section80TTA => Some(DeductionSection::Sec80TTA),
            _ => None,
        }
    }

    /// All codes in catalogue order.
    pub fn all() -> &'static [FieldCode] {
        &[
            Self::SalaryIncome,
            Self::HousePropertyIncome,
            Self::InterestIncome,
            Self::DividendIncome,
            Self::OtherSourcesIncome,
            Self::AgriculturalIncome,
            Self::ShortTermCapitalGains,
            Self::LongTermCapitalGains,
            Self::ForeignAssetValue,
            Self::BusinessIncome,
            Self::PresumptiveBusinessIncome,
            Self::PresumptiveProfessionalIncome,
            Self::StandardDeduction,
            Self::Section80C,
            Self::Section80CCD1B,
            Self::Section80CCD2,
            Self::Section80D,
            Self::Section80E,
            Self::Section80G,
            Self::Section80TTA,
            Self::TdsSalary,
            Self::TdsOther,
            Self::AdvanceTax,
            Self::SelfAssessmentTax,
        ]
    }
}

impl std::fmt::Display for FieldCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FieldCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::invalid("field", format!("unknown field code {s:?}")))
    }
}

/// Identifies one reported value: a catalogue code plus optional instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldId {
    code: FieldCode,
    instance: Option<String>,
}

impl FieldId {
    /// A field without an instance qualifier.
    pub fn new(code: FieldCode) -> Self {
        Self {
            code,
            instance: None,
        }
    }

    /// A field with an instance qualifier (employer TAN, property number).
    pub fn with_instance(code: FieldCode, instance: impl Into<String>) -> Result<Self, ValidationError> {
        let instance = instance.into();
        let trimmed = instance.trim();
        if trimmed.is_empty() || trimmed.contains(['[', ']']) {
            return Err(ValidationError::invalid(
                code.as_str(),
                format!("instance qualifier must be non-empty and bracket-free, got {instance:?}"),
            ));
        }
        Ok(Self {
            code,
            instance: Some(trimmed.to_string()),
        })
    }

    /// Parse `code` or `code[instance]`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.split_once('[') {
            None => Ok(Self::new(s.parse()?)),
            Some((code, rest)) => {
                let instance = rest.strip_suffix(']').ok_or_else(|| {
                    ValidationError::invalid("field", format!("unterminated instance in {s:?}"))
                })?;
                Self::with_instance(code.parse()?, instance)
            }
        }
    }

    /// The catalogue code.
    pub fn code(&self) -> FieldCode {
        self.code
    }

    /// The instance qualifier, if any.
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }
}

impl From<FieldCode> for FieldId {
    fn from(code: FieldCode) -> Self {
        Self::new(code)
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "{}[{}]", self.code, instance),
            None => f.write_str(self.code.as_str()),
        }
    }
}

impl TryFrom<String> for FieldId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FieldId> for String {
    fn from(id: FieldId) -> Self {
        id.to_string()
    }
}

impl std::str::FromStr for FieldId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_round_trips_through_its_identifier_and_label() {
        for code in FieldCode::all() {
            assert_eq!(code.as_str().parse::<FieldCode>().unwrap(), *code);
            assert_eq!(FieldCode::from_schema_label(code.schema_label()), Some(*code));
            let json = serde_json::to_string(code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn kinds_and_categories_are_consistent() {
        for code in FieldCode::all() {
            match code.kind() {
                FieldKind::Deduction => assert!(code.deduction_section().is_some()),
                FieldKind::TaxPaid => {
                    assert!(code.deduction_section().is_none());
                    assert!(code.income_category().is_none());
                }
                FieldKind::Income | FieldKind::ExemptIncome | FieldKind::Disclosure => {
                    assert!(code.income_category().is_some())
                }
            }
        }
    }

    #[test]
    fn field_id_parses_instances() {
        let id = FieldId::parse("salary_income[TAN:BLRA12345B]").unwrap();
        assert_eq!(id.code(), FieldCode::SalaryIncome);
        assert_eq!(id.instance(), Some("TAN:BLRA12345B"));
        assert_eq!(id.to_string(), "salary_income[TAN:BLRA12345B]");

        let plain = FieldId::parse("section_80c").unwrap();
        assert_eq!(plain, FieldId::new(FieldCode::Section80C));
    }

    #[test]
    fn field_id_rejects_malformed() {
        assert!(FieldId::parse("salary_income[").is_err());
        assert!(FieldId::parse("salary_income[]").is_err());
        assert!(FieldId::parse("bonus_income").is_err());
    }

    #[test]
    fn field_ids_order_by_code_then_instance() {
        let a = FieldId::with_instance(FieldCode::HousePropertyIncome, "1").unwrap();
        let b = FieldId::with_instance(FieldCode::HousePropertyIncome, "2").unwrap();
        let salary = FieldId::new(FieldCode::SalaryIncome);
        assert!(salary < a);
        assert!(a < b);
    }

    #[test]
    fn field_id_serializes_as_string_map_key() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(FieldId::new(FieldCode::SalaryIncome), 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"salary_income":1}"#);
    }
}
