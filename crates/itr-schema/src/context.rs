//! Builder inputs and the built document.

use std::collections::BTreeMap;

use itr_core::{AckNumber, AssessmentYear, CanonicalBytes, ContentDigest, FieldId, FilingFor, ItrType, Pan};
use itr_tax::TaxComputation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BuildError;

/// Filing-level facts printed in the document header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingHeader {
    pub pan: Pan,
    pub assessment_year: AssessmentYear,
    pub itr_type: ItrType,
    pub filing_for: FilingFor,
    /// Acknowledgement of the original return, for revised returns.
    #[serde(default)]
    pub original_ack: Option<AckNumber>,
}

/// Everything a form builder reads.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub header: &'a FilingHeader,
    /// Accepted amount per field.
    pub resolved: &'a BTreeMap<FieldId, Decimal>,
    pub computation: &'a TaxComputation,
}

/// A built, schema-valid return document with its content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub itr_type: ItrType,
    pub document: serde_json::Value,
    /// SHA-256 over the JCS-canonical document.
    pub digest: ContentDigest,
}

impl SchemaDocument {
    /// Wrap a document, computing its digest.
    pub fn new(itr_type: ItrType, document: serde_json::Value) -> Result<Self, BuildError> {
        let digest = ContentDigest::of(&CanonicalBytes::new(&document)?);
        Ok(Self {
            itr_type,
            document,
            digest,
        })
    }

    /// The canonical bytes the digest was computed over.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, BuildError> {
        Ok(CanonicalBytes::new(&self.document)?)
    }
}
