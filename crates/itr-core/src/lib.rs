//! # itr-core: Foundational Types for the ITR Filing Engine
//!
//! The leaf of the workspace DAG. Defines the type-system primitives every
//! other crate builds on:
//!
//! 1. **Newtype identifiers.** `FilingId`, `FactId`, `ReturnVersionId`, `Pan`,
//!    `AckNumber`; no bare strings or UUIDs cross crate boundaries.
//!
//! 2. **Closed field catalogue.** `FieldCode` enumerates every value the
//!    engine reconciles. Adding a code forces every schedule builder, the
//!    recommender and the calculator input mapping to handle it.
//!
//! 3. **Decimal money.** Amounts are `rust_decimal::Decimal`, serialized as
//!    strings. Floats never reach a hashed or persisted structure.
//!
//! 4. **`CanonicalBytes` newtype.** Return documents are hashed only through
//!    `CanonicalBytes::new()`, so two equal documents always produce the same
//!    ReturnVersion digest.
//!
//! 5. **UTC-only timestamps** truncated to seconds.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `itr-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod domain;
pub mod error;
pub mod field;
pub mod identity;
pub mod money;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::ContentDigest;
pub use domain::{AssessmentYear, EntityKind, FactSource, FilingFor, ItrType, Regime};
pub use error::{CanonicalizationError, ItrError, ValidationError};
pub use field::{DeductionSection, FieldCode, FieldId, FieldKind, IncomeCategory};
pub use identity::{AckNumber, ComputationId, FactId, FilingId, OwnerId, Pan, ReturnVersionId};
pub use money::{amount_from_json, amount_to_json, round_rupee};
pub use temporal::Timestamp;
