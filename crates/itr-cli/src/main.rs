//! # itr CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use itr_cli::build::{run_build, BuildArgs};
use itr_cli::compute::{run_compare, run_compute, CompareArgs, ComputeArgs};
use itr_cli::input::TablesSource;
use itr_cli::recommend::{run_recommend, RecommendArgs};
use itr_cli::tables::{run_tables, TablesArgs};

/// ITR filing engine CLI.
///
/// Computes tax under either regime, recommends a return form and builds
/// return documents from a JSON or YAML facts file.
#[derive(Parser, Debug)]
#[command(name = "itr", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    tables: TablesSource,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute liability under one regime.
    Compute(ComputeArgs),

    /// Compute both regimes and recommend the cheaper.
    Compare(CompareArgs),

    /// Recommend the simplest eligible return form.
    Recommend(RecommendArgs),

    /// Build a schema-valid return document.
    Build(BuildArgs),

    /// List, print or validate statutory tables.
    Tables(TablesArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Compute(args) => run_compute(args, &cli.tables),
        Commands::Compare(args) => run_compare(args, &cli.tables),
        Commands::Recommend(args) => run_recommend(args),
        Commands::Build(args) => run_build(args, &cli.tables),
        Commands::Tables(args) => run_tables(args, &cli.tables),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
