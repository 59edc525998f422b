//! # Identity Newtypes
//!
//! Newtype wrappers for every identifier in the filing engine. A `FactId`
//! cannot be passed where a `FilingId` is expected, and a PAN or
//! acknowledgement number can only exist in validated form.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

uuid_id!(
    /// One tax return instance.
    FilingId,
    "filing"
);
uuid_id!(
    /// The platform user who owns a filing.
    OwnerId,
    "owner"
);
uuid_id!(
    /// A single reported value from one source.
    FactId,
    "fact"
);
uuid_id!(
    /// One immutable tax computation snapshot.
    ComputationId,
    "computation"
);
uuid_id!(
    /// One immutable return document snapshot.
    ReturnVersionId,
    "return-version"
);

/// Permanent Account Number.
///
/// Format: five letters, four digits, one letter (`ABCPE1234F`). The fourth
/// letter encodes the holder type (`P` individual, `C` company, `F` firm,
/// `T` trust, `H` HUF, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pan(String);

impl Pan {
    /// Validate and normalise (upper-case) a PAN.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let pan = raw.as_ref().trim().to_ascii_uppercase();
        let bytes = pan.as_bytes();
        let well_formed = bytes.len() == 10
            && bytes[..5].iter().all(u8::is_ascii_uppercase)
            && bytes[5..9].iter().all(u8::is_ascii_digit)
            && bytes[9].is_ascii_uppercase();
        if !well_formed {
            return Err(ValidationError::invalid(
                "pan",
                format!("expected format AAAAA9999A, got {:?}", raw.as_ref()),
            ));
        }
        Ok(Self(pan))
    }

    /// The PAN as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The holder-type letter (fourth character).
    pub fn holder_type(&self) -> char {
        self.0.as_bytes()[3] as char
    }
}

impl TryFrom<String> for Pan {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Pan> for String {
    fn from(pan: Pan) -> Self {
        pan.0
    }
}

impl std::fmt::Display for Pan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Acknowledgement number issued by the filing gateway on a successful
/// submission. Fifteen digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AckNumber(String);

impl AckNumber {
    /// Number of digits in an acknowledgement number.
    pub const LEN: usize = 15;

    /// Validate an acknowledgement number.
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let ack = raw.into();
        if ack.len() != Self::LEN || !ack.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ValidationError::invalid(
                "ack_number",
                format!("expected {} digits, got {ack:?}", Self::LEN),
            ));
        }
        Ok(Self(ack))
    }

    /// The acknowledgement number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AckNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AckNumber> for String {
    fn from(ack: AckNumber) -> Self {
        ack.0
    }
}

impl std::fmt::Display for AckNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
