//! Errors raised by table loading and tax computation.

use itr_core::AssessmentYear;
use thiserror::Error;

/// Failure to load statutory tables or compute a liability.
#[derive(Error, Debug)]
pub enum TaxError {
    /// No statutory table is configured for the requested year.
    #[error("no statutory tables configured for assessment year {year}")]
    UnknownYear {
        /// The requested assessment year.
        year: AssessmentYear,
    },

    /// A table failed validation on load.
    #[error("invalid statutory table for {year} at {section}: {reason}")]
    InvalidTable {
        /// The year the table claims to cover.
        year: AssessmentYear,
        /// Location of the problem (`old.slabs[2]`, `cess_rate`).
        section: String,
        /// What was wrong.
        reason: String,
    },

    /// A table file could not be parsed.
    #[error("failed to parse statutory table {source_name}: {reason}")]
    Parse {
        /// File name or `builtin:<year>`.
        source_name: String,
        /// Parser message.
        reason: String,
    },

    /// Two table files claim the same year.
    #[error("duplicate statutory tables for assessment year {year}")]
    DuplicateYear {
        /// The repeated year.
        year: AssessmentYear,
    },

    /// An input amount was negative.
    #[error("amount for {field} must be non-negative, got {amount}")]
    NegativeAmount {
        /// Field identifier (`total_income`, `section_80c`, `taxes_paid`).
        field: String,
        /// The rejected amount.
        amount: rust_decimal::Decimal,
    },

    /// Reading a table directory failed.
    #[error("io error reading statutory tables: {0}")]
    Io(#[from] std::io::Error),
}
