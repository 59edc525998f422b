//! # Schema Validation
//!
//! Each supported form ships a JSON Schema (draft 2020-12) under
//! `schemas/`, embedded at compile time. Validators are compiled once when
//! the registry is built and shared across threads.

use std::collections::BTreeMap;
use std::fmt;

use itr_core::ItrType;
use jsonschema::Validator;
use serde_json::Value;

use crate::error::{BuildError, Violation};

const EMBEDDED: &[(ItrType, &str)] = &[
    (ItrType::Itr1, include_str!("../schemas/itr1.schema.json")),
    (ItrType::Itr2, include_str!("../schemas/itr2.schema.json")),
    (ItrType::Itr3, include_str!("../schemas/itr3.schema.json")),
    (ItrType::Itr4, include_str!("../schemas/itr4.schema.json")),
];

/// Compiled validators for every supported form.
pub struct SchemaRegistry {
    validators: BTreeMap<ItrType, Validator>,
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("forms", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaRegistry {
    /// Compile the embedded schemas.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::SchemaLoad` if a schema is not valid JSON or
    /// not a valid draft 2020-12 schema.
    pub fn embedded() -> Result<Self, BuildError> {
        let mut validators = BTreeMap::new();
        for (itr, text) in EMBEDDED {
            let schema: Value = serde_json::from_str(text).map_err(|e| BuildError::SchemaLoad {
                itr: *itr,
                reason: format!("invalid JSON: {e}"),
            })?;
            let mut opts = jsonschema::options();
            opts.with_draft(jsonschema::Draft::Draft202012);
            let validator = opts.build(&schema).map_err(|e| BuildError::SchemaLoad {
                itr: *itr,
                reason: e.to_string(),
            })?;
            validators.insert(*itr, validator);
        }
        Ok(Self { validators })
    }

    /// Forms with a schema.
    pub fn forms(&self) -> impl Iterator<Item = ItrType> + '_ {
        self.validators.keys().copied()
    }

    /// The raw embedded schema for `itr`.
    pub fn schema_text(itr: ItrType) -> Option<&'static str> {
        EMBEDDED.iter().find(|(t, _)| *t == itr).map(|(_, s)| *s)
    }

    /// Validate `document` against the schema for `itr`.
    ///
    /// # Errors
    ///
    /// `UnsupportedForm` when no schema exists; `SchemaViolation` listing
    /// every violation otherwise.
    pub fn validate(&self, itr: ItrType, document: &Value) -> Result<(), BuildError> {
        let validator = self
            .validators
            .get(&itr)
            .ok_or(BuildError::UnsupportedForm { itr })?;

        let violations: Vec<Violation> = validator
            .iter_errors(document)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(BuildError::SchemaViolation { itr, violations })
        }
    }
}
