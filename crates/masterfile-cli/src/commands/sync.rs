use masterfile_core::error::MasterfileError;
use masterfile_core::parsing::parse_filename;
use masterfile_core::{sync_slides, MergeContext};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::{load_config, ConfigArgs};
use crate::output;

pub fn run(
    args: &ConfigArgs,
    workbook: &Path,
    deck: &Path,
    images: &[(String, PathBuf)],
    output_format: &str,
) -> Result<(), MasterfileError> {
    let config = load_config(args)?;
    let rules = config.rule_store()?;

    let image_map: HashMap<_, _> = images
        .iter()
        .map(|(drawing, image)| (parse_filename(drawing), image.clone()))
        .collect();

    let ctx = MergeContext {
        config: &config,
        rules: &rules,
    };
    let report = sync_slides(ctx, workbook, deck, &image_map)?;

    match output_format {
        "json" => output::json::print(&report)?,
        _ => output::table::print_sync(&mut std::io::stdout().lock(), &report, deck)?,
    }
    Ok(())
}
