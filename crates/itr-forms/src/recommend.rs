//! # Form Recommendation
//!
//! Picks the simplest return form the taxpayer's resolved income allows.
//! Individuals are tried in the order ITR-1, ITR-4, ITR-2, ITR-3; entities
//! have exactly one form each. The recommender never changes a filing: it
//! reports whether the current form is still eligible and leaves the switch
//! to an explicit confirm step.

use std::collections::{BTreeMap, BTreeSet};

use itr_core::{EntityKind, FieldCode, FieldId, FieldKind, FilingFor, IncomeCategory, ItrType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Total income ceiling for ITR-1 and ITR-4 (₹50 lakh).
pub const SIMPLE_FORM_INCOME_CEILING: i64 = 5_000_000;
/// Agricultural income ceiling for ITR-1.
pub const ITR1_AGRICULTURAL_CEILING: i64 = 5_000;
/// House properties allowed on ITR-1 and ITR-4.
pub const SIMPLE_FORM_MAX_PROPERTIES: usize = 1;

/// Income sources present on a filing, derived from resolved values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeProfile {
    /// Total per category; only non-zero categories are present.
    pub categories: BTreeMap<IncomeCategory, Decimal>,
    /// Distinct house properties with a non-zero amount.
    pub house_properties: usize,
    /// Sum of taxable income heads.
    pub gross_total_income: Decimal,
    /// Exempt agricultural income.
    pub agricultural_income: Decimal,
    /// Set when the filing is for a firm, LLP, company or trust.
    pub entity: Option<EntityKind>,
}

impl IncomeProfile {
    /// Build a profile from accepted amounts.
    pub fn from_resolved(values: &BTreeMap<FieldId, Decimal>, filing_for: &FilingFor) -> Self {
        let mut profile = Self {
            entity: filing_for.entity_kind(),
            ..Self::default()
        };
        let mut properties = BTreeSet::new();

        for (field, amount) in values {
            if amount.is_zero() {
                continue;
            }
            let code = field.code();
            let Some(category) = code.income_category() else {
                continue;
            };
            *profile.categories.entry(category).or_default() += *amount;
            match code.kind() {
                FieldKind::Income => profile.gross_total_income += *amount,
                FieldKind::ExemptIncome => profile.agricultural_income += *amount,
                _ => {}
            }
            if code == FieldCode::HousePropertyIncome {
                properties.insert(field.instance().unwrap_or_default().to_string());
            }
        }
        profile.house_properties = properties.len();
        profile
    }

    /// Whether any non-zero amount was reported in `category`.
    pub fn has(&self, category: IncomeCategory) -> bool {
        self.categories.contains_key(&category)
    }
}

/// Outcome of a recommendation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// The simplest eligible form.
    pub recommended: ItrType,
    /// Why simpler forms were ruled out, and whether the current form fits.
    pub reasons: Vec<String>,
    /// True iff the current form is not eligible.
    pub requires_switch: bool,
    /// Every eligible form, simplest first.
    pub eligible: Vec<ItrType>,
}

/// Why `itr` cannot carry `profile`; empty when eligible.
pub fn ineligibility(profile: &IncomeProfile, itr: ItrType) -> Vec<String> {
    let mut why = Vec::new();
    let ceiling = Decimal::from(SIMPLE_FORM_INCOME_CEILING);

    if let Some(entity) = profile.entity {
        if entity.return_form() != itr {
            why.push(format!("{entity} returns are filed on {}", entity.return_form()));
        }
        return why;
    }
    if !itr.is_individual_form() {
        why.push(format!("{itr} is only for firms, LLPs, companies and trusts"));
        return why;
    }

    let simple = matches!(itr, ItrType::Itr1 | ItrType::Itr4);
    if simple {
        if profile.has(IncomeCategory::CapitalGains) {
            why.push("capital gains reported".into());
        }
        if profile.has(IncomeCategory::ForeignAssets) {
            why.push("foreign assets reported".into());
        }
        if profile.house_properties > SIMPLE_FORM_MAX_PROPERTIES {
            why.push(format!("{} house properties reported", profile.house_properties));
        }
        if profile.gross_total_income > ceiling {
            why.push(format!("total income {} exceeds {}", profile.gross_total_income, ceiling));
        }
        if profile.has(IncomeCategory::Business) {
            why.push("business or professional income reported".into());
        }
    }

    match itr {
        ItrType::Itr1 => {
            if !profile.has(IncomeCategory::Salary) {
                why.push("no salary or pension income reported".into());
            }
            if profile.has(IncomeCategory::Presumptive) {
                why.push("presumptive income reported".into());
            }
            let agri_ceiling = Decimal::from(ITR1_AGRICULTURAL_CEILING);
            if profile.agricultural_income > agri_ceiling {
                why.push(format!(
                    "agricultural income {} exceeds {}",
                    profile.agricultural_income, agri_ceiling
                ));
            }
        }
        ItrType::Itr4 => {
            if !profile.has(IncomeCategory::Presumptive) {
                why.push("no presumptive income reported".into());
            }
        }
        ItrType::Itr2 => {
            if profile.has(IncomeCategory::Business) || profile.has(IncomeCategory::Presumptive) {
                why.push("business or presumptive income reported".into());
            }
        }
        ItrType::Itr3 => {
            if !profile.has(IncomeCategory::Business) && !profile.has(IncomeCategory::Presumptive) {
                why.push("no business or presumptive income reported".into());
            }
        }
        _ => {}
    }
    why
}

const INDIVIDUAL_ORDER: [ItrType; 4] = [ItrType::Itr1, ItrType::Itr4, ItrType::Itr2, ItrType::Itr3];

/// Recommend the simplest eligible form for `profile`.
pub fn recommend(profile: &IncomeProfile, current: ItrType) -> Recommendation {
    let order: &[ItrType] = match profile.entity {
        Some(entity) => match entity.return_form() {
            ItrType::Itr5 => &[ItrType::Itr5],
            ItrType::Itr6 => &[ItrType::Itr6],
            _ => &[ItrType::Itr7],
        },
        None => &INDIVIDUAL_ORDER,
    };

    let mut reasons = Vec::new();
    let mut eligible = Vec::new();
    for itr in order {
        let why = ineligibility(profile, *itr);
        if why.is_empty() {
            eligible.push(*itr);
        } else if eligible.is_empty() {
            reasons.push(format!("{itr} not applicable: {}", why.join("; ")));
        }
    }
    // Without business income ITR-2 fits an individual, with it ITR-3 does.
    let recommended = eligible.first().copied().unwrap_or(ItrType::Itr3);

    let current_why = ineligibility(profile, current);
    let requires_switch = !current_why.is_empty();
    if requires_switch {
        reasons.push(format!(
            "current form {current} not applicable: {}",
            current_why.join("; ")
        ));
    }

    Recommendation {
        recommended,
        reasons,
        requires_switch,
        eligible,
    }
}
