//! # Canonical Serialization
//!
//! `CanonicalBytes` is the sole construction path for bytes that feed a
//! content digest: ReturnVersion digests and submission payload digests.
//!
//! ## Invariant
//!
//! The inner `Vec<u8>` is private. The only constructor checks for floats
//! and then applies RFC 8785 (JCS) serialization, so two structurally equal
//! return documents always hash to the same digest regardless of map
//! insertion order or whitespace.
//!
//! Floats are refused rather than rounded. Money is `Decimal` (serialized
//! as a string) or a whole-rupee integer, so a float here is a bug upstream;
//! the error names the JSON pointer of the offending value.
//!
//! Timestamps reach this layer as `Timestamp`, which serializes to
//! `YYYY-MM-DDTHH:MM:SSZ` on its own.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// JCS bytes of a float-free value. Construct with [`CanonicalBytes::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Serialize `value`, refuse floats, then canonicalize.
    pub fn new(value: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(value)?;
        let mut path = String::new();
        first_float(&value, &mut path)?;
        Ok(Self(serde_jcs::to_string(&value)?.into_bytes()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The canonical text. JCS output is always UTF-8.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Walk `value` depth-first, extending `path` as a JSON pointer, and fail
/// on the first non-integer number.
fn first_float(value: &Value, path: &mut String) -> Result<(), CanonicalizationError> {
    match value {
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => Err(CanonicalizationError::FloatRejected {
            path: if path.is_empty() { "/".to_string() } else { path.clone() },
            value: n.as_f64().unwrap_or(f64::NAN),
        }),
        Value::Array(items) => items.iter().enumerate().try_for_each(|(i, item)| {
            descend(path, &i.to_string(), |p| first_float(item, p))
        }),
        Value::Object(map) => map
            .iter()
            .try_for_each(|(key, item)| descend(path, &escape(key), |p| first_float(item, p))),
        _ => Ok(()),
    }
}

fn descend<T>(path: &mut String, segment: &str, f: impl FnOnce(&mut String) -> T) -> T {
    let len = path.len();
    path.push('/');
    path.push_str(segment);
    let out = f(path);
    path.truncate(len);
    out
}

/// RFC 6901 token escaping.
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
