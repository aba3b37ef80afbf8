use masterfile_core::error::MasterfileError;
use masterfile_core::parsing::parse_filename;
use masterfile_core::rules;
use std::path::Path;

use super::{load_config, ConfigArgs};

pub fn list(args: &ConfigArgs) -> Result<(), MasterfileError> {
    let store = load_config(args)?.rule_store()?;

    println!("{} ({} equipment)\n", store.name(), store.iter().count());
    println!(
        "  {:<16} {:<10} {:>5}  {:<18} {}",
        "PMT No", "Equipment", "Slide", "Operating from", "Force null"
    );
    for entry in store.iter() {
        let slide = entry
            .slide_index
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".into());
        let operating = if entry.use_template_operating {
            "template"
        } else {
            "drawing"
        };
        let force_null = entry.design.as_ref().is_some_and(|d| d.force_null_operating);
        println!(
            "  {:<16} {:<10} {:>5}  {:<18} {}",
            entry.pmt_no,
            entry.equipment_no,
            slide,
            operating,
            if force_null { "yes" } else { "no" }
        );
    }
    Ok(())
}

pub fn show(args: &ConfigArgs, drawing: &str) -> Result<(), MasterfileError> {
    let store = load_config(args)?.rule_store()?;
    let key = parse_filename(drawing);

    match store.get(&key) {
        Some(entry) => println!("{}", serde_json::to_string_pretty(entry)?),
        None => println!("No rule for {key}; extraction uses the base instructions."),
    }
    Ok(())
}

pub fn validate(file: &Path) -> Result<(), MasterfileError> {
    let rs = rules::load_ruleset(file)?;
    rules::validate_ruleset(&rs)?;

    println!("Ruleset '{}' (v{}) is valid.", rs.name, rs.version);
    println!("  Equipment: {}", rs.equipment.len());
    let slides = rs.equipment.iter().filter(|e| e.slide_index.is_some()).count();
    println!("  With slides: {slides}");

    // Possible mistakes, not errors
    let mut warnings = Vec::new();
    for entry in &rs.equipment {
        if entry.use_template_operating
            && !entry.design.as_ref().is_some_and(|d| d.force_null_operating)
        {
            warnings.push(format!(
                "{} - {} takes operating values from the template but keeps extracted ones as fallback",
                entry.pmt_no, entry.equipment_no
            ));
        }
        if entry.design.is_none() && entry.bom.is_none() {
            warnings.push(format!(
                "{} - {} has no extraction hints",
                entry.pmt_no, entry.equipment_no
            ));
        }
    }

    if !warnings.is_empty() {
        println!("\nWarnings:");
        for w in &warnings {
            println!("  - {}", w);
        }
    }

    Ok(())
}
