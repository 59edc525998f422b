//! # itr-tax: Regime Calculator
//!
//! Pure, stateless computation of Indian individual income tax under the
//! old and new regimes. Every statutory number lives in per-year
//! [`StatutoryTables`]; the calculator only knows the order of operations.
//!
//! ```text
//! TableProvider ──tables(AY)──▶ StatutoryTables
//!                                     │
//! TaxInput ──▶ TaxCalculator::compute ┴──▶ TaxComputation
//!              TaxCalculator::compare ───▶ RegimeComparison
//! ```
//!
//! The calculator is `Send + Sync` and holds no state between calls, so
//! different filings can be computed concurrently.

pub mod calculator;
pub mod error;
pub mod tables;

pub use calculator::{
    compare_regimes, compute, DeductionClaim, DeductionOutcome, DisallowReason, MarginalRelief,
    RegimeComparison, SlabCharge, TaxCalculator, TaxComputation, TaxInput,
};
pub use error::TaxError;
pub use tables::{RebateRule, RegimeTable, Slab, StatutoryTables, SurchargeTier, TableProvider, TableSet};
