//! Liability invariants over arbitrary incomes and claims, for both
//! regimes and every built-in year.

use itr_core::{AssessmentYear, DeductionSection, Regime};
use itr_tax::{compute, DeductionClaim, StatutoryTables, TableProvider, TableSet};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn all_tables() -> Vec<std::sync::Arc<StatutoryTables>> {
    let set = TableSet::builtin().unwrap();
    set.years()
        .into_iter()
        .map(|y| set.tables(y).unwrap())
        .collect()
}

fn rupees(max: i64) -> impl Strategy<Value = Decimal> {
    // Whole rupees plus paise, so fractional intermediate values occur.
    (0..=max, 0..100i64).prop_map(|(r, p)| Decimal::new(r * 100 + p, 2))
}

fn claim() -> impl Strategy<Value = DeductionClaim> {
    (
        prop::sample::select(DeductionSection::all().to_vec()),
        rupees(300_000),
    )
        .prop_map(|(section, amount)| DeductionClaim::new(section, amount))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn total_tax_is_exact_sum_and_non_negative(
        income in rupees(80_000_000),
        claims in prop::collection::vec(claim(), 0..6),
    ) {
        for tables in all_tables() {
            for regime in Regime::all() {
                let c = compute(income, &claims, *regime, &tables).unwrap();
                prop_assert!(c.total_tax >= Decimal::ZERO);
                prop_assert_eq!(c.slab_tax - c.rebate + c.surcharge + c.cess, c.total_tax);
                prop_assert!(c.taxable_income >= Decimal::ZERO);
                prop_assert!(c.taxable_income <= income);
                prop_assert!(c.rebate <= c.slab_tax);
                prop_assert!(c.surcharge >= Decimal::ZERO);
            }
        }
    }

    #[test]
    fn allowed_never_exceeds_claimed(
        income in rupees(5_000_000),
        claims in prop::collection::vec(claim(), 0..6),
    ) {
        for tables in all_tables() {
            for regime in Regime::all() {
                let c = compute(income, &claims, *regime, &tables).unwrap();
                for d in &c.deductions {
                    prop_assert!(d.allowed <= d.claimed);
                    prop_assert_eq!(d.allowed + d.disallowed, d.claimed);
                }
            }
        }
    }

    #[test]
    fn more_income_never_means_less_tax(
        income in rupees(60_000_000),
        extra in rupees(500_000),
    ) {
        for tables in all_tables() {
            for regime in Regime::all() {
                let lower = compute(income, &[], *regime, &tables).unwrap();
                let higher = compute(income + extra, &[], *regime, &tables).unwrap();
                prop_assert!(higher.total_tax >= lower.total_tax);
            }
        }
    }
}

#[test]
fn salaried_scenario_at_rebate_boundary() {
    let set = TableSet::builtin().unwrap();
    let tables = set.tables(AssessmentYear::parse("2025-26").unwrap()).unwrap();
    let c = compute(
        Decimal::from(480_000),
        &[
            DeductionClaim::new(DeductionSection::StandardDeduction, Decimal::from(50_000)),
            DeductionClaim::new(DeductionSection::Sec80C, Decimal::from(150_000)),
        ],
        Regime::Old,
        &tables,
    )
    .unwrap();
    assert_eq!(c.taxable_income, Decimal::from(280_000));
    assert_eq!(c.total_tax, Decimal::ZERO);
    assert_eq!(c.net_payable, Decimal::ZERO);
    assert_eq!(c.refundable, Decimal::ZERO);
}
