use masterfile_core::error::MasterfileError;
use masterfile_core::extraction::response::{parse_bom_items, parse_design_metadata};
use masterfile_core::model::DesignMetadata;
use masterfile_core::{append_equipment, MergeContext};
use std::path::{Path, PathBuf};

use super::{load_config, ConfigArgs};
use crate::output;

pub fn run(
    args: &ConfigArgs,
    drawing: &str,
    workbook: &Path,
    design: Option<PathBuf>,
    bom: &[PathBuf],
    output_format: &str,
) -> Result<(), MasterfileError> {
    let config = load_config(args)?;
    let rules = config.rule_store()?;

    let design_meta = match design {
        Some(path) => parse_design_metadata(&std::fs::read_to_string(&path)?),
        None => DesignMetadata::default(),
    };
    let mut bom_items = Vec::new();
    for path in bom {
        bom_items.extend(parse_bom_items(&std::fs::read_to_string(path)?));
    }

    let ctx = MergeContext {
        config: &config,
        rules: &rules,
    };
    let outcome = append_equipment(ctx, workbook, drawing, &design_meta, &bom_items)?;

    match output_format {
        "json" => output::json::print(&outcome)?,
        _ => output::table::print_append(&mut std::io::stdout().lock(), &outcome, workbook)?,
    }
    Ok(())
}
