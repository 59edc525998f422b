//! # itr-schema: Return Documents
//!
//! Assembles the government JSON return document for ITR-1 through ITR-4
//! from a filing's resolved values and its tax computation, validates it
//! against the form's JSON Schema, and digests it for the ReturnVersion.
//!
//! ```text
//! BuildContext ──▶ FormBuilder::assemble ──▶ SchemaRegistry::validate
//!                                                   │
//!                         SchemaDocument { document, digest } ◀──┘
//! ```
//!
//! [`parse_resolved_fields`] is the inverse of the line-item encoding and
//! reproduces the accepted values a document was built from.

pub mod context;
pub mod error;
pub mod forms;
pub mod parse;
pub mod schedules;
pub mod validate;

pub use context::{BuildContext, FilingHeader, SchemaDocument};
pub use error::{BuildError, Violation};
pub use forms::{build, builder_for, FormBuilder, Itr1, Itr2, Itr3, Itr4, ReturnBuilder};
pub use parse::parse_resolved_fields;
pub use validate::SchemaRegistry;
