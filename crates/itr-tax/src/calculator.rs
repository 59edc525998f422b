//! # Regime Calculator
//!
//! Pure computation of income tax liability under either regime:
//!
//! ```text
//! gross total income
//!   − allowed deductions (regime- and section-capped, floor at zero)
//!   = taxable income
//!   → slab tax
//!   − rebate u/s 87A (with marginal relief where the year allows it)
//!   + surcharge (tiered, with marginal relief at each threshold)
//!   + cess on (slab tax − rebate + surcharge)
//!   = total tax
//! ```
//!
//! Intermediate figures are never rounded. `total_tax` is exactly
//! `slab_tax − rebate + surcharge + cess`; only `rounded_total_tax` and the
//! settlement against taxes already paid are rounded to the rupee.

use std::collections::BTreeMap;

use itr_core::{round_rupee, AssessmentYear, DeductionSection, FieldCode, FieldId, FieldKind, Regime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::TaxError;
use crate::tables::{RegimeTable, StatutoryTables};

/// A claimed deduction, before regime rules and caps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionClaim {
    /// The section claimed under.
    pub section: DeductionSection,
    /// Amount claimed.
    pub amount: Decimal,
}

impl DeductionClaim {
    /// Shorthand constructor.
    pub fn new(section: DeductionSection, amount: Decimal) -> Self {
        Self { section, amount }
    }
}

/// Inputs to one regime computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxInput {
    /// Gross total income before deductions.
    pub total_income: Decimal,
    /// Claimed deductions. Repeated sections are summed before capping.
    #[serde(default)]
    pub deductions: Vec<DeductionClaim>,
    /// Regime to compute under.
    pub regime: Regime,
    /// TDS, advance tax and self-assessment tax already paid.
    #[serde(default)]
    pub taxes_paid: Decimal,
}

impl TaxInput {
    /// Derive calculator input from accepted field values.
    ///
    /// Income heads sum to total income; exempt income and disclosures are
    /// ignored. Salaried filers without an explicit standard deduction
    /// claim it against their salary, and the regime cap applies.
    pub fn from_resolved(values: &BTreeMap<FieldId, Decimal>, regime: Regime) -> Self {
        let mut total_income = Decimal::ZERO;
        let mut taxes_paid = Decimal::ZERO;
        let mut salary = Decimal::ZERO;
        let mut deductions = Vec::new();

        for (field, amount) in values {
            let code = field.code();
            match code.kind() {
                FieldKind::Income => total_income += *amount,
                FieldKind::TaxPaid => taxes_paid += *amount,
                FieldKind::Deduction => {
                    if let Some(section) = code.deduction_section() {
                        deductions.push(DeductionClaim::new(section, *amount));
                    }
                }
                FieldKind::ExemptIncome | FieldKind::Disclosure => {}
            }
            if code == FieldCode::SalaryIncome {
                salary += *amount;
            }
        }

        let claims_standard = deductions
            .iter()
            .any(|d| d.section == DeductionSection::StandardDeduction);
        if !claims_standard && salary > Decimal::ZERO {
            deductions.insert(0, DeductionClaim::new(DeductionSection::StandardDeduction, salary));
        }

        Self {
            total_income,
            deductions,
            regime,
            taxes_paid,
        }
    }
}

/// Why part of a claim was not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisallowReason {
    /// The regime does not recognise the section.
    NotAllowedInRegime,
    /// The claim exceeds the section's statutory cap.
    ExceedsCap,
}

/// The outcome for one claimed section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionOutcome {
    /// The section.
    pub section: DeductionSection,
    /// Total claimed.
    pub claimed: Decimal,
    /// Amount allowed after regime rules and caps.
    pub allowed: Decimal,
    /// `claimed - allowed`.
    pub disallowed: Decimal,
    /// Set when `disallowed > 0`.
    pub reason: Option<DisallowReason>,
}

/// Tax charged within one slab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlabCharge {
    /// Slab lower bound.
    pub from: Decimal,
    /// Slab upper bound (`None` for the top slab).
    pub to: Option<Decimal>,
    /// Marginal rate.
    pub rate: Decimal,
    /// Income falling in this slab.
    pub income: Decimal,
    /// Tax on that income.
    pub tax: Decimal,
}

/// Marginal relief granted at the rebate ceiling and surcharge thresholds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginalRelief {
    /// Part of the rebate granted above the 87A ceiling.
    pub rebate: Decimal,
    /// Reduction of surcharge at the applicable threshold.
    pub surcharge: Decimal,
}

/// Full result of one regime computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxComputation {
    pub assessment_year: AssessmentYear,
    pub regime: Regime,
    pub gross_total_income: Decimal,
    pub deductions: Vec<DeductionOutcome>,
    pub total_deductions: Decimal,
    pub taxable_income: Decimal,
    pub slabs: Vec<SlabCharge>,
    pub slab_tax: Decimal,
    pub rebate: Decimal,
    pub surcharge_rate: Decimal,
    pub surcharge: Decimal,
    pub marginal_relief: MarginalRelief,
    pub cess: Decimal,
    /// Exactly `slab_tax - rebate + surcharge + cess`.
    pub total_tax: Decimal,
    pub rounded_total_tax: Decimal,
    pub taxes_paid: Decimal,
    pub net_payable: Decimal,
    pub refundable: Decimal,
}

impl TaxComputation {
    /// Sum of amounts disallowed across every section.
    pub fn total_disallowed(&self) -> Decimal {
        self.deductions.iter().map(|d| d.disallowed).sum()
    }
}

/// Side-by-side result of computing both regimes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegimeComparison {
    pub old: TaxComputation,
    pub new: TaxComputation,
    /// Regime with the lower rounded liability. Ties go to the new regime.
    pub recommended: Regime,
    /// Difference between the two rounded liabilities.
    pub savings: Decimal,
}

impl RegimeComparison {
    /// The computation for `regime`.
    pub fn for_regime(&self, regime: Regime) -> &TaxComputation {
        match regime {
            Regime::Old => &self.old,
            Regime::New => &self.new,
        }
    }
}

/// Calculator bound to one year's statutory tables.
#[derive(Debug, Clone, Copy)]
pub struct TaxCalculator<'t> {
    tables: &'t StatutoryTables,
}

impl<'t> TaxCalculator<'t> {
    /// Bind a calculator to `tables`.
    pub fn new(tables: &'t StatutoryTables) -> Self {
        Self { tables }
    }

    /// The assessment year this calculator computes for.
    pub fn assessment_year(&self) -> AssessmentYear {
        self.tables.assessment_year
    }

    /// Compute liability for one regime.
    pub fn compute(&self, input: &TaxInput) -> Result<TaxComputation, TaxError> {
        non_negative("total_income", input.total_income)?;
        non_negative("taxes_paid", input.taxes_paid)?;
        for claim in &input.deductions {
            non_negative(claim.section.as_str(), claim.amount)?;
        }

        let table = self.tables.regime(input.regime);
        let deductions = apply_deductions(table, &input.deductions);
        let total_deductions: Decimal = deductions.iter().map(|d| d.allowed).sum();
        let taxable_income = (input.total_income - total_deductions).max(Decimal::ZERO);

        for d in deductions.iter().filter(|d| d.reason == Some(DisallowReason::NotAllowedInRegime)) {
            tracing::warn!(
                regime = %input.regime,
                section = %d.section,
                amount = %d.claimed,
                "deduction not allowed under regime"
            );
        }

        let slabs = slab_breakdown(table, taxable_income);
        let slab_tax: Decimal = slabs.iter().map(|s| s.tax).sum();

        let (rebate, rebate_relief) = rebate(table, taxable_income, slab_tax);
        let tax_after_rebate = slab_tax - rebate;

        let (surcharge_rate, surcharge, surcharge_relief) =
            surcharge(table, taxable_income, tax_after_rebate);

        let cess = (tax_after_rebate + surcharge) * self.tables.cess_rate;
        let total_tax = slab_tax - rebate + surcharge + cess;
        let rounded_total_tax = round_rupee(total_tax);

        let balance = rounded_total_tax - input.taxes_paid;
        let net_payable = round_rupee(balance.max(Decimal::ZERO));
        let refundable = round_rupee((-balance).max(Decimal::ZERO));

        Ok(TaxComputation {
            assessment_year: self.tables.assessment_year,
            regime: input.regime,
            gross_total_income: input.total_income,
            deductions,
            total_deductions,
            taxable_income,
            slabs,
            slab_tax,
            rebate,
            surcharge_rate,
            surcharge,
            marginal_relief: MarginalRelief {
                rebate: rebate_relief,
                surcharge: surcharge_relief,
            },
            cess,
            total_tax,
            rounded_total_tax,
            taxes_paid: input.taxes_paid,
            net_payable,
            refundable,
        })
    }

    /// Compute both regimes for the same facts and recommend the cheaper.
    pub fn compare(
        &self,
        total_income: Decimal,
        deductions: &[DeductionClaim],
        taxes_paid: Decimal,
    ) -> Result<RegimeComparison, TaxError> {
        let input = |regime| TaxInput {
            total_income,
            deductions: deductions.to_vec(),
            regime,
            taxes_paid,
        };
        let old = self.compute(&input(Regime::Old))?;
        let new = self.compute(&input(Regime::New))?;
        let recommended = if old.rounded_total_tax < new.rounded_total_tax {
            Regime::Old
        } else {
            Regime::New
        };
        let savings = (old.rounded_total_tax - new.rounded_total_tax).abs();
        Ok(RegimeComparison {
            old,
            new,
            recommended,
            savings,
        })
    }
}

/// Compute liability for one regime with no taxes paid.
pub fn compute(
    total_income: Decimal,
    deductions: &[DeductionClaim],
    regime: Regime,
    tables: &StatutoryTables,
) -> Result<TaxComputation, TaxError> {
    TaxCalculator::new(tables).compute(&TaxInput {
        total_income,
        deductions: deductions.to_vec(),
        regime,
        taxes_paid: Decimal::ZERO,
    })
}

/// Stateless comparison of both regimes. Nothing is stored.
pub fn compare_regimes(
    total_income: Decimal,
    deductions: &[DeductionClaim],
    taxes_paid: Decimal,
    tables: &StatutoryTables,
) -> Result<RegimeComparison, TaxError> {
    TaxCalculator::new(tables).compare(total_income, deductions, taxes_paid)
}

fn non_negative(field: &str, amount: Decimal) -> Result<(), TaxError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(TaxError::NegativeAmount {
            field: field.to_string(),
            amount,
        });
    }
    Ok(())
}

fn apply_deductions(table: &RegimeTable, claims: &[DeductionClaim]) -> Vec<DeductionOutcome> {
    let mut claimed: BTreeMap<DeductionSection, Decimal> = BTreeMap::new();
    for claim in claims {
        *claimed.entry(claim.section).or_default() += claim.amount;
    }

    claimed
        .into_iter()
        .map(|(section, claimed)| {
            let (allowed, reason) = if !table.allows(section) {
                (Decimal::ZERO, Some(DisallowReason::NotAllowedInRegime))
            } else {
                match table.cap(section) {
                    Some(cap) if claimed > cap => (cap, Some(DisallowReason::ExceedsCap)),
                    _ => (claimed, None),
                }
            };
            let reason = if claimed.is_zero() { None } else { reason };
            DeductionOutcome {
                section,
                claimed,
                allowed,
                disallowed: claimed - allowed,
                reason,
            }
        })
        .collect()
}

fn slab_breakdown(table: &RegimeTable, income: Decimal) -> Vec<SlabCharge> {
    table
        .slabs
        .iter()
        .map(|slab| {
            let upper = slab.to.map_or(income, |to| income.min(to));
            let in_slab = (upper - slab.from).max(Decimal::ZERO);
            SlabCharge {
                from: slab.from,
                to: slab.to,
                rate: slab.rate,
                income: in_slab,
                tax: in_slab * slab.rate,
            }
        })
        .collect()
}

/// Returns `(rebate, part of the rebate granted as marginal relief)`.
fn rebate(table: &RegimeTable, taxable: Decimal, tax: Decimal) -> (Decimal, Decimal) {
    let rule = &table.rebate;
    if taxable <= rule.income_ceiling {
        return (tax.min(rule.max_rebate), Decimal::ZERO);
    }
    if rule.marginal_relief {
        let excess = taxable - rule.income_ceiling;
        if tax > excess {
            let relief = tax - excess;
            return (relief, relief);
        }
    }
    (Decimal::ZERO, Decimal::ZERO)
}

/// Returns `(rate, surcharge after relief, relief granted)`.
fn surcharge(table: &RegimeTable, taxable: Decimal, tax: Decimal) -> (Decimal, Decimal, Decimal) {
    let Some(index) = table.surcharge.iter().rposition(|t| taxable > t.threshold) else {
        return (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO);
    };
    let tier = &table.surcharge[index];
    let gross = tax * tier.rate;

    // At the threshold itself the previous tier (or none) applies.
    let prior_rate = index
        .checked_sub(1)
        .map_or(Decimal::ZERO, |i| table.surcharge[i].rate);
    let tax_at_threshold = table.slab_tax(tier.threshold);
    let ceiling = tax_at_threshold * (Decimal::ONE + prior_rate) + (taxable - tier.threshold);

    let relief = (tax + gross - ceiling).max(Decimal::ZERO).min(gross);
    (tier.rate, gross - relief, relief)
}
