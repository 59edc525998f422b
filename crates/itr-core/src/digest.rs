//! # Content Digests
//!
//! A [`ContentDigest`] names a return document by content: SHA-256 over
//! its [`CanonicalBytes`]. Two documents that differ only in key order or
//! whitespace share a digest; any change to an amount does not.
//!
//! On the wire a digest is the string `sha256:<64 lowercase hex>`.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::ValidationError;

const PREFIX: &str = "sha256:";

/// SHA-256 of a canonical document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Digest `data`. Raw byte slices are not accepted.
    pub fn of(data: &CanonicalBytes) -> Self {
        Self(Sha256::digest(data.as_bytes()).into())
    }

    /// Whether `data` hashes to this digest.
    pub fn matches(&self, data: &CanonicalBytes) -> bool {
        Self::of(data) == *self
    }

    /// Lowercase hex without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse `sha256:<hex>`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::invalid("digest", format!("expected sha256:<64 hex digits>, got {s:?}"));
        let hex = s.strip_prefix(PREFIX).ok_or_else(invalid)?;
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(invalid());
        }
        let mut out = [0u8; 32];
        for (i, byte) in out.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(out))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{PREFIX}{}", self.to_hex())
    }
}

impl std::str::FromStr for ContentDigest {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentDigest> for String {
    fn from(d: ContentDigest) -> Self {
        d.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(v: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::new(&v).unwrap()
    }

    #[test]
    fn key_order_does_not_change_the_digest() {
        let a = canonical(serde_json::json!({"Form": "ITR-1", "AssessmentYear": "2025"}));
        let b = canonical(serde_json::json!({"AssessmentYear": "2025", "Form": "ITR-1"}));
        assert_eq!(ContentDigest::of(&a), ContentDigest::of(&b));
    }

    #[test]
    fn a_changed_amount_does() {
        let a = canonical(serde_json::json!({"TotalIncome": "280000"}));
        let b = canonical(serde_json::json!({"TotalIncome": "280001"}));
        let digest = ContentDigest::of(&a);
        assert!(digest.matches(&a));
        assert!(!digest.matches(&b));
    }

    #[test]
    fn empty_object_vector() {
        let digest = ContentDigest::of(&canonical(serde_json::json!({})));
        assert_eq!(
            digest.to_string(),
            "sha256:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn wire_form_round_trips() {
        let digest = ContentDigest::of(&canonical(serde_json::json!({"PAN": "ABCPE1234F"})));
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{digest}\""));
        assert_eq!(serde_json::from_str::<ContentDigest>(&json).unwrap(), digest);
    }

    #[test]
    fn malformed_digests_are_refused() {
        let upper = format!("sha256:{}", "A".repeat(64));
        let short = format!("sha256:{}", "0".repeat(63));
        for bad in ["", "sha256:", "md5:00", upper.as_str(), short.as_str()] {
            assert!(ContentDigest::parse(bad).is_err(), "{bad:?}");
        }
    }
}
