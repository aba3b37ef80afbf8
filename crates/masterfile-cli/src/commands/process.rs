use masterfile_core::error::MasterfileError;
use masterfile_core::extraction::replay::ReplayOracle;
use masterfile_core::pipeline::{load_jobs, process_batch, OutputPaths};
use masterfile_core::MergeContext;
use std::path::{Path, PathBuf};

use super::{load_config, ConfigArgs};
use crate::output;

pub fn run(
    args: &ConfigArgs,
    jobs_file: &Path,
    answers: &Path,
    workbook: PathBuf,
    deck: PathBuf,
    output_format: &str,
) -> Result<(), MasterfileError> {
    let config = load_config(args)?;
    let rules = config.rule_store()?;
    let jobs = load_jobs(jobs_file)?;
    let oracle = ReplayOracle::new(answers);

    let ctx = MergeContext {
        config: &config,
        rules: &rules,
    };
    let paths = OutputPaths { workbook, deck };
    let report = process_batch(ctx, &oracle, &jobs, &paths)?;

    match output_format {
        "json" => output::json::print(&report)?,
        _ => output::table::print_batch(&mut std::io::stdout().lock(), &report)?,
    }

    if !report.is_clean() {
        eprintln!(
            "{} drawing(s) failed, {} with skipped regions",
            report.failures.len(),
            report
                .drawings
                .iter()
                .filter(|d| !d.failed_regions.is_empty())
                .count()
        );
    }
    Ok(())
}
