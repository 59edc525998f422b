//! # itr-cli: Command-Line Interface for the Filing Engine
//!
//! Runs the computation side of a filing against a local facts file,
//! without the filing lifecycle or the HTTP surface.
//!
//! ## Subcommands
//!
//! - `compute`: liability under one regime
//! - `compare`: both regimes side by side, with the cheaper one named
//! - `recommend`: simplest eligible return form
//! - `build`: schema-valid return document and its digest
//! - `tables`: list, print or check statutory tables
//!
//! Handlers delegate to the domain crates and return the process exit
//! code; argument parsing lives in `main.rs`.

pub mod build;
pub mod compute;
pub mod input;
pub mod recommend;
pub mod tables;
