use masterfile_core::error::MasterfileError;
use masterfile_core::extraction::prompts;
use masterfile_core::parsing::parse_filename;

use super::{load_config, ConfigArgs};

pub fn design(args: &ConfigArgs, drawing: &str) -> Result<(), MasterfileError> {
    let rules = load_config(args)?.rule_store()?;
    let key = parse_filename(drawing);
    println!("{}", prompts::design_instruction(rules.get_design_rule(&key)));
    Ok(())
}

pub fn bom(args: &ConfigArgs, drawing: &str) -> Result<(), MasterfileError> {
    let rules = load_config(args)?.rule_store()?;
    let key = parse_filename(drawing);
    println!("{}", prompts::bom_instruction(rules.get_bom_rule(&key)));
    Ok(())
}
