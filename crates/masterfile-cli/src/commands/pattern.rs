use masterfile_core::error::MasterfileError;
use masterfile_core::parsing::parse_filename;
use masterfile_core::template::{extract_equipment_pattern, load_template};

use super::{load_config, ConfigArgs};
use crate::output;

pub fn run(
    args: &ConfigArgs,
    drawing: &str,
    output_format: &str,
) -> Result<(), MasterfileError> {
    let config = load_config(args)?;
    let template = &config.template_path;
    let sheet = load_template(template, &config.sheet_name)?;

    let key = parse_filename(drawing);
    let pattern = extract_equipment_pattern(&sheet, &key, config.first_data_row);
    if pattern.is_empty() {
        eprintln!("No block for {key} in {}", template.display());
    }

    match output_format {
        "json" => output::json::print(&pattern)?,
        _ => output::table::print_pattern(&mut std::io::stdout().lock(), &key, &pattern)?,
    }
    Ok(())
}
