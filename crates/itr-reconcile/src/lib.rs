//! # itr-reconcile: Discrepancy Resolution
//!
//! Income and deduction values arrive from several sources that rarely agree
//! to the rupee: the taxpayer's own entry, OCR over Form 16 and bank
//! certificates, and the government's aggregated statements. This crate
//! decides which value each field carries and grades every disagreement.
//!
//! The engine is a pure function of the fact set and the previous
//! reconciliation. Manual resolutions are the only state it carries forward.

pub mod engine;
pub mod error;
pub mod fact;

pub use engine::{ReconcileConfig, Reconciler, Reconciliation, SYSTEM_DECIDER};
pub use error::ReconcileError;
pub use fact::{
    Discrepancy, DiscrepancyStatus, Fact, FactDraft, Resolution, ResolutionReason, Severity,
};
