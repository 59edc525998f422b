//! `itr tables`: inspect the statutory tables in effect.

use anyhow::Result;
use clap::Args;
use itr_core::AssessmentYear;
use itr_tax::TableProvider;

use crate::input::TablesSource;

/// Arguments for `itr tables`.
#[derive(Args, Debug)]
pub struct TablesArgs {
    /// Print this year's tables as YAML. Without it, list the configured years.
    #[arg(long)]
    pub year: Option<AssessmentYear>,

    /// Only load and validate; print nothing on success.
    #[arg(long)]
    pub check: bool,
}

/// Execute `itr tables`.
pub fn run_tables(args: &TablesArgs, source: &TablesSource) -> Result<u8> {
    let set = source.load()?;
    if args.check {
        tracing::info!(years = set.years().len(), "statutory tables valid");
        return Ok(0);
    }
    match args.year {
        Some(year) => print!("{}", serde_yaml::to_string(&*set.tables(year)?)?),
        None => {
            for year in set.years() {
                println!("{year}");
            }
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_list_and_print() {
        let source = TablesSource::default();
        let list = TablesArgs { year: None, check: false };
        assert_eq!(run_tables(&list, &source).unwrap(), 0);
        let one = TablesArgs {
            year: Some(AssessmentYear::parse("2025-26").unwrap()),
            check: false,
        };
        assert_eq!(run_tables(&one, &source).unwrap(), 0);
    }

    #[test]
    fn a_broken_tables_dir_fails_the_check() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2025-26.yaml"), "assessment_year: 2025-26\ncess_rate: \"7\"\n").unwrap();
        let source = TablesSource {
            tables_dir: Some(dir.path().to_path_buf()),
        };
        assert!(run_tables(&TablesArgs { year: None, check: true }, &source).is_err());
    }
}
