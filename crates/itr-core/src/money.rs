//! # Rupee Amounts
//!
//! All amounts are `rust_decimal::Decimal` rupees. Binary floating point
//! never touches a monetary value: canonicalization rejects floats, so a
//! return document carries whole rupees as JSON integers and fractional
//! amounts as decimal strings.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::error::ValidationError;

/// Round to whole rupees, half away from zero (`0.50` becomes `1`).
pub fn round_rupee(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Encode an amount for a return document.
///
/// Whole amounts that fit an `i64` become JSON integers; everything else
/// becomes a normalized decimal string.
pub fn amount_to_json(amount: Decimal) -> Value {
    if amount.fract().is_zero() {
        if let Some(whole) = amount.to_i64() {
            return Value::from(whole);
        }
    }
    Value::String(amount.normalize().to_string())
}

/// Decode an amount written by [`amount_to_json`] (or any integer/decimal
/// string). Fractional JSON numbers are parsed through their decimal text.
pub fn amount_from_json(field: &str, value: &Value) -> Result<Decimal, ValidationError> {
    let parsed = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Decimal::from(i)),
            None => Decimal::from_str(&n.to_string()),
        },
        Value::String(s) => Decimal::from_str(s.trim()),
        other => {
            return Err(ValidationError::invalid(
                field,
                format!("expected amount, got {other}"),
            ))
        }
    };
    parsed.map_err(|e| ValidationError::invalid(field, format!("invalid amount {value}: {e}")))
}
