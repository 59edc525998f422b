//! `itr recommend`: the simplest return form the reported income fits.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use itr_core::ItrType;
use itr_forms::{recommend, IncomeProfile, Recommendation};
use itr_reconcile::Reconciler;

use crate::input::FactsFile;

/// Arguments for `itr recommend`.
#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// Facts file (JSON or YAML).
    #[arg(value_name = "FACTS")]
    pub input: PathBuf,

    /// Form currently selected. Defaults to the file's `itr_type`, then ITR-1.
    #[arg(long)]
    pub current: Option<ItrType>,

    /// Print the recommendation as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn recommendation(args: &RecommendArgs) -> Result<Recommendation> {
    let file = FactsFile::load(&args.input)?;
    let current = args.current.or(file.itr_type).unwrap_or(ItrType::Itr1);
    let values = file.reconcile(&Reconciler::default())?.resolved_values();
    let profile = IncomeProfile::from_resolved(&values, &file.filing_for());
    Ok(recommend(&profile, current))
}

/// Execute `itr recommend`. Exits 2 when the current form must change.
pub fn run_recommend(args: &RecommendArgs) -> Result<u8> {
    let rec = recommendation(args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rec)?);
    } else {
        println!("recommended: {}", rec.recommended);
        let eligible: Vec<String> = rec.eligible.iter().map(ToString::to_string).collect();
        println!("eligible:    {}", eligible.join(", "));
        for reason in &rec.reasons {
            println!("  - {reason}");
        }
    }
    Ok(if rec.requires_switch { 2 } else { 0 })
}
