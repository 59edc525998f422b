//! # Compute and Compare Subcommands
//!
//! `itr compute` reports the liability under one regime; `itr compare`
//! computes both and names the cheaper one. Both reconcile the facts
//! file first and compute over the accepted values.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use itr_core::Regime;
use itr_reconcile::Reconciler;
use itr_tax::{RegimeComparison, TaxCalculator, TaxComputation, TaxInput};

use crate::input::{FactsFile, TablesSource};

/// Arguments for `itr compute`.
#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Facts file (JSON or YAML).
    #[arg(value_name = "FACTS")]
    pub input: PathBuf,

    /// Regime to compute under. Defaults to the file's `regime`, then `new`.
    #[arg(long)]
    pub regime: Option<Regime>,

    /// Print the full computation as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `itr compare`.
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Facts file (JSON or YAML).
    #[arg(value_name = "FACTS")]
    pub input: PathBuf,

    /// Print both computations as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn compute(args: &ComputeArgs, tables: &TablesSource) -> Result<TaxComputation> {
    let file = FactsFile::load(&args.input)?;
    let regime = args.regime.or(file.regime).unwrap_or(Regime::New);
    let values = file.reconcile(&Reconciler::default())?.resolved_values();
    let tables = tables.for_year(file.assessment_year)?;
    TaxCalculator::new(&tables)
        .compute(&TaxInput::from_resolved(&values, regime))
        .context("tax computation failed")
}

pub fn compare(args: &CompareArgs, tables: &TablesSource) -> Result<RegimeComparison> {
    let file = FactsFile::load(&args.input)?;
    let values = file.reconcile(&Reconciler::default())?.resolved_values();
    let tables = tables.for_year(file.assessment_year)?;
    let input = TaxInput::from_resolved(&values, Regime::New);
    TaxCalculator::new(&tables)
        .compare(input.total_income, &input.deductions, input.taxes_paid)
        .context("regime comparison failed")
}

/// Execute `itr compute`.
pub fn run_compute(args: &ComputeArgs, tables: &TablesSource) -> Result<u8> {
    let computation = compute(args, tables)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&computation)?);
    } else {
        print!("{}", summary(&computation));
    }
    Ok(0)
}

/// Execute `itr compare`.
pub fn run_compare(args: &CompareArgs, tables: &TablesSource) -> Result<u8> {
    let comparison = compare(args, tables)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&comparison)?);
        return Ok(0);
    }
    print!("{}", summary(&comparison.old));
    println!();
    print!("{}", summary(&comparison.new));
    println!();
    println!(
        "recommended: {} regime (saves {})",
        comparison.recommended,
        comparison.savings
    );
    Ok(0)
}

/// Human-readable breakdown of one computation.
pub fn summary(c: &TaxComputation) -> String {
    let mut out = format!("{} regime, AY {}\n", c.regime, c.assessment_year);
    let mut line = |label: &str, value: &dyn std::fmt::Display| {
        out.push_str(&format!("  {label:<24}{value:>14}\n"));
    };
    line("gross total income", &c.gross_total_income);
    line("deductions", &c.total_deductions);
    line("taxable income", &c.taxable_income);
    line("tax on slabs", &c.slab_tax);
    line("rebate u/s 87A", &c.rebate);
    line("surcharge", &c.surcharge);
    line("cess", &c.cess);
    line("total tax", &c.rounded_total_tax);
    line("taxes paid", &c.taxes_paid);
    if c.refundable > rust_decimal::Decimal::ZERO {
        line("refund due", &c.refundable);
    } else {
        line("payable", &c.net_payable);
    }
    for d in c.deductions.iter().filter(|d| d.disallowed > rust_decimal::Decimal::ZERO) {
        out.push_str(&format!("  note: {} disallowed {}\n", d.section, d.disallowed));
    }
    out
}
