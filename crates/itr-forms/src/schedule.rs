//! Schedules each return form carries, and the fields that must be
//! resolved before intake can complete.

use std::collections::BTreeSet;

use itr_core::{FieldCode, FieldId, FieldKind, IncomeCategory, ItrType};
use serde::{Deserialize, Serialize};

/// A schedule (section) of a return form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    Salary,
    HouseProperty,
    OtherSources,
    CapitalGains,
    BusinessProfession,
    Presumptive,
    ForeignAssets,
    ExemptIncome,
    ChapterVia,
    TaxesPaid,
}

impl ScheduleKind {
    /// Return the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Salary => "salary",
            Self::HouseProperty => "house_property",
            Self::OtherSources => "other_sources",
            Self::CapitalGains => "capital_gains",
            Self::BusinessProfession => "business_profession",
            Self::Presumptive => "presumptive",
            Self::ForeignAssets => "foreign_assets",
            Self::ExemptIncome => "exempt_income",
            Self::ChapterVia => "chapter_via",
            Self::TaxesPaid => "taxes_paid",
        }
    }

    /// The schedule a field is reported in.
    pub fn for_field(code: FieldCode) -> Self {
        if code == FieldCode::StandardDeduction {
            return Self::Salary;
        }
        match code.kind() {
            FieldKind::Deduction => return Self::ChapterVia,
            FieldKind::TaxPaid => return Self::TaxesPaid,
            _ => {}
        }
        match code.income_category() {
            Some(IncomeCategory::Salary) => Self::Salary,
            Some(IncomeCategory::HouseProperty) => Self::HouseProperty,
            Some(IncomeCategory::OtherSources) => Self::OtherSources,
            Some(IncomeCategory::Agricultural) => Self::ExemptIncome,
            Some(IncomeCategory::CapitalGains) => Self::CapitalGains,
            Some(IncomeCategory::ForeignAssets) => Self::ForeignAssets,
            Some(IncomeCategory::Business) => Self::BusinessProfession,
            Some(IncomeCategory::Presumptive) | None => Self::Presumptive,
        }
    }
}

impl std::fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScheduleKind {
    type Err = itr_core::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ScheduleKind::*;
        [
            Salary,
            HouseProperty,
            OtherSources,
            CapitalGains,
            BusinessProfession,
            Presumptive,
            ForeignAssets,
            ExemptIncome,
            ChapterVia,
            TaxesPaid,
        ]
        .into_iter()
        .find(|k| k.as_str() == s)
        .ok_or_else(|| itr_core::ValidationError::invalid("schedule", format!("unknown schedule {s:?}")))
    }
}

/// Schedules a form carries.
pub fn schedules_for(itr: ItrType) -> &'static [ScheduleKind] {
    use ScheduleKind::*;
    match itr {
        ItrType::Itr1 => &[Salary, HouseProperty, OtherSources, ExemptIncome, ChapterVia, TaxesPaid],
        ItrType::Itr2 => &[
            Salary,
            HouseProperty,
            OtherSources,
            CapitalGains,
            ForeignAssets,
            ExemptIncome,
            ChapterVia,
            TaxesPaid,
        ],
        ItrType::Itr3 => &[
            Salary,
            HouseProperty,
            OtherSources,
            CapitalGains,
            BusinessProfession,
            Presumptive,
            ForeignAssets,
            ExemptIncome,
            ChapterVia,
            TaxesPaid,
        ],
        ItrType::Itr4 => &[
            Salary,
            HouseProperty,
            OtherSources,
            Presumptive,
            ExemptIncome,
            ChapterVia,
            TaxesPaid,
        ],
        ItrType::Itr5 | ItrType::Itr6 | ItrType::Itr7 => &[
            HouseProperty,
            OtherSources,
            CapitalGains,
            BusinessProfession,
            Presumptive,
            ForeignAssets,
            ExemptIncome,
            ChapterVia,
            TaxesPaid,
        ],
    }
}

/// Whether `itr` has a schedule for `code`.
pub fn permits(itr: ItrType, code: FieldCode) -> bool {
    schedules_for(itr).contains(&ScheduleKind::for_field(code))
}

/// A requirement satisfied by a resolution for any one of its codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MandatoryRequirement {
    /// Reported in errors when unmet (a field code or a group name).
    pub name: &'static str,
    pub any_of: &'static [FieldCode],
}

impl MandatoryRequirement {
    /// Whether any resolved field satisfies this requirement.
    pub fn is_met<'a>(&self, resolved: impl IntoIterator<Item = &'a FieldId>) -> bool {
        resolved
            .into_iter()
            .any(|field| self.any_of.contains(&field.code()))
    }
}

const INCOME_HEADS: &[FieldCode] = &[
    FieldCode::SalaryIncome,
    FieldCode::HousePropertyIncome,
    FieldCode::InterestIncome,
    FieldCode::DividendIncome,
    FieldCode::OtherSourcesIncome,
    FieldCode::AgriculturalIncome,
    FieldCode::ShortTermCapitalGains,
    FieldCode::LongTermCapitalGains,
    FieldCode::ForeignAssetValue,
];

const ANY_INCOME: &[FieldCode] = &[
    FieldCode::SalaryIncome,
    FieldCode::HousePropertyIncome,
    FieldCode::InterestIncome,
    FieldCode::DividendIncome,
    FieldCode::OtherSourcesIncome,
    FieldCode::AgriculturalIncome,
    FieldCode::ShortTermCapitalGains,
    FieldCode::LongTermCapitalGains,
    FieldCode::ForeignAssetValue,
    FieldCode::BusinessIncome,
    FieldCode::PresumptiveBusinessIncome,
    FieldCode::PresumptiveProfessionalIncome,
];

/// Fields that must be resolved before intake completes for `itr`.
///
/// Each individual form's requirement mirrors what makes a profile
/// eligible for it in [`ineligibility`](crate::ineligibility), so the
/// recommended form for any profile with income can always finish intake.
pub fn mandatory_requirements(itr: ItrType) -> &'static [MandatoryRequirement] {
    const SALARY: MandatoryRequirement = MandatoryRequirement {
        name: "salary_income",
        any_of: &[FieldCode::SalaryIncome],
    };
    const HEADS: MandatoryRequirement = MandatoryRequirement {
        name: "income_heads",
        any_of: INCOME_HEADS,
    };
    const BUSINESS: MandatoryRequirement = MandatoryRequirement {
        name: "business_income",
        any_of: &[
            FieldCode::BusinessIncome,
            FieldCode::PresumptiveBusinessIncome,
            FieldCode::PresumptiveProfessionalIncome,
        ],
    };
    const PRESUMPTIVE_INCOME: MandatoryRequirement = MandatoryRequirement {
        name: "presumptive_income",
        any_of: &[
            FieldCode::PresumptiveBusinessIncome,
            FieldCode::PresumptiveProfessionalIncome,
        ],
    };
    const ENTITY_INCOME: MandatoryRequirement = MandatoryRequirement {
        name: "income_heads",
        any_of: ANY_INCOME,
    };
    match itr {
        ItrType::Itr1 => &[SALARY],
        ItrType::Itr2 => &[HEADS],
        ItrType::Itr3 => &[BUSINESS],
        ItrType::Itr4 => &[PRESUMPTIVE_INCOME],
        ItrType::Itr5 | ItrType::Itr6 | ItrType::Itr7 => &[ENTITY_INCOME],
    }
}

/// Names of unmet requirements, in declaration order.
pub fn missing_mandatory<'a>(itr: ItrType, resolved: impl IntoIterator<Item = &'a FieldId>) -> Vec<String> {
    let resolved: BTreeSet<&FieldId> = resolved.into_iter().collect();
    mandatory_requirements(itr)
        .iter()
        .filter(|req| !req.is_met(resolved.iter().copied()))
        .map(|req| req.name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_maps_into_some_form() {
        for code in FieldCode::all() {
            assert!(ItrType::all().iter().any(|itr| permits(*itr, *code)), "{code}");
        }
    }

    #[test]
    fn itr1_excludes_capital_gains_and_business() {
        assert!(permits(ItrType::Itr1, FieldCode::SalaryIncome));
        assert!(permits(ItrType::Itr1, FieldCode::StandardDeduction));
        assert!(permits(ItrType::Itr1, FieldCode::Section80C));
        assert!(!permits(ItrType::Itr1, FieldCode::ShortTermCapitalGains));
        assert!(!permits(ItrType::Itr1, FieldCode::ForeignAssetValue));
        assert!(!permits(ItrType::Itr1, FieldCode::BusinessIncome));
        assert!(permits(ItrType::Itr4, FieldCode::PresumptiveProfessionalIncome));
        assert!(!permits(ItrType::Itr4, FieldCode::LongTermCapitalGains));
        assert!(permits(ItrType::Itr2, FieldCode::ForeignAssetValue));
    }

    #[test]
    fn mandatory_fields_per_form() {
        let salary = FieldId::new(FieldCode::SalaryIncome);
        let interest = FieldId::new(FieldCode::InterestIncome);

        assert!(missing_mandatory(ItrType::Itr1, [&salary]).is_empty());
        assert_eq!(missing_mandatory(ItrType::Itr1, [&interest]), vec!["salary_income"]);
        assert!(missing_mandatory(ItrType::Itr2, [&interest]).is_empty());
        assert_eq!(missing_mandatory(ItrType::Itr2, std::iter::empty::<&FieldId>()), vec!["income_heads"]);
        assert_eq!(missing_mandatory(ItrType::Itr3, [&salary]), vec!["business_income"]);
        assert_eq!(missing_mandatory(ItrType::Itr4, [&salary]), vec!["presumptive_income"]);
    }

    #[test]
    fn presumptive_income_satisfies_itr3() {
        let presumptive = FieldId::new(FieldCode::PresumptiveBusinessIncome);
        assert!(missing_mandatory(ItrType::Itr3, [&presumptive]).is_empty());
        assert!(missing_mandatory(ItrType::Itr4, [&presumptive]).is_empty());
    }

    #[test]
    fn disclosure_only_itr2_profiles_complete() {
        let foreign = FieldId::new(FieldCode::ForeignAssetValue);
        let agricultural = FieldId::new(FieldCode::AgriculturalIncome);
        assert!(missing_mandatory(ItrType::Itr2, [&foreign]).is_empty());
        assert!(missing_mandatory(ItrType::Itr2, [&agricultural]).is_empty());
    }

    #[test]
    fn entity_forms_accept_any_income() {
        let interest = FieldId::new(FieldCode::InterestIncome);
        assert!(missing_mandatory(ItrType::Itr7, [&interest]).is_empty());
        assert_eq!(missing_mandatory(ItrType::Itr6, std::iter::empty::<&FieldId>()), vec!["income_heads"]);
    }

    #[test]
    fn instances_satisfy_requirements() {
        let employer = FieldId::with_instance(FieldCode::SalaryIncome, "TAN:A").unwrap();
        assert!(missing_mandatory(ItrType::Itr1, [&employer]).is_empty());
    }

    #[test]
    fn schedule_names_parse() {
        for itr in ItrType::all() {
            for kind in schedules_for(*itr) {
                assert_eq!(kind.as_str().parse::<ScheduleKind>().unwrap(), *kind);
            }
        }
        assert!("schedule_xyz".parse::<ScheduleKind>().is_err());
    }
}
