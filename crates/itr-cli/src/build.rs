//! # Build Subcommand
//!
//! `itr build` turns a facts file into a schema-valid return document:
//! reconcile, compute under the chosen regime, then assemble and validate
//! the form. The document is written as pretty JSON; its canonical digest
//! goes to stderr so stdout stays a clean document.
//!
//! Open blocking discrepancies stop the build unless
//! `--allow-discrepancies` is given, in which case the accepted values
//! are used as they stand.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use itr_core::{ItrType, Regime};
use itr_reconcile::Reconciler;
use itr_schema::{BuildContext, FilingHeader, ReturnBuilder, SchemaDocument};
use itr_tax::{TaxCalculator, TaxInput};

use crate::input::{FactsFile, TablesSource};

/// Arguments for `itr build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Facts file (JSON or YAML). Must carry `pan`.
    #[arg(value_name = "FACTS")]
    pub input: PathBuf,

    /// Form to build. Defaults to the file's `itr_type`.
    #[arg(long)]
    pub itr_type: Option<ItrType>,

    /// Regime to compute under. Defaults to the file's `regime`.
    #[arg(long)]
    pub regime: Option<Regime>,

    /// Write the document here instead of stdout.
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Build even when blocking discrepancies are open.
    #[arg(long)]
    pub allow_discrepancies: bool,
}

pub fn build_document(args: &BuildArgs, tables: &TablesSource) -> Result<SchemaDocument> {
    let file = FactsFile::load(&args.input)?;
    let Some(pan) = file.pan.clone() else {
        bail!("facts file has no `pan`; it is required to build a return");
    };
    let Some(itr_type) = args.itr_type.or(file.itr_type) else {
        bail!("no form selected; pass --itr-type or set `itr_type` in the facts file");
    };
    let Some(regime) = args.regime.or(file.regime) else {
        bail!("no regime selected; pass --regime or set `regime` in the facts file");
    };

    let reconciliation = file.reconcile(&Reconciler::default())?;
    let open: Vec<String> = reconciliation.open_blocking().map(|d| d.field.to_string()).collect();
    if !open.is_empty() && !args.allow_discrepancies {
        bail!("blocking discrepancies on: {}", open.join(", "));
    }
    let resolved = reconciliation.resolved_values();

    let tables = tables.for_year(file.assessment_year)?;
    let computation = TaxCalculator::new(&tables)
        .compute(&TaxInput::from_resolved(&resolved, regime))
        .context("tax computation failed")?;

    let header = FilingHeader {
        pan,
        assessment_year: file.assessment_year,
        itr_type,
        filing_for: file.filing_for(),
        original_ack: file.original_ack.clone(),
    };
    let document = ReturnBuilder::new()?.build(&BuildContext {
        header: &header,
        resolved: &resolved,
        computation: &computation,
    })?;
    tracing::info!(itr = %itr_type, regime = %regime, digest = %document.digest, "return built");
    Ok(document)
}

/// Execute `itr build`.
pub fn run_build(args: &BuildArgs, tables: &TablesSource) -> Result<u8> {
    let document = build_document(args, tables)?;
    let json = serde_json::to_string_pretty(&document.document)?;
    match &args.out {
        Some(path) => std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    eprintln!("{}", document.digest);
    Ok(0)
}
