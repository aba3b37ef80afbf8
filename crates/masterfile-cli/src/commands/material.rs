use masterfile_core::error::MasterfileError;
use masterfile_core::parsing::parse_spec_grade;
use serde::Serialize;

use crate::output;

#[derive(Debug, Serialize)]
pub struct ParsedMaterial {
    pub raw: String,
    pub spec: String,
    pub grade: String,
}

pub fn run(raw: &[String], output_format: &str) -> Result<(), MasterfileError> {
    let parsed: Vec<ParsedMaterial> = raw
        .iter()
        .map(|r| {
            let (spec, grade) = parse_spec_grade(Some(r.as_str()));
            ParsedMaterial {
                raw: r.clone(),
                spec,
                grade,
            }
        })
        .collect();

    match output_format {
        "json" => output::json::print(&parsed)?,
        _ => output::table::print_materials(&mut std::io::stdout().lock(), &parsed)?,
    }
    Ok(())
}
