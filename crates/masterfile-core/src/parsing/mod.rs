pub mod material;
pub mod normalize;
pub mod values;

use std::path::Path;

use crate::model::EquipmentKey;

pub use material::parse_spec_grade;

/// Derive the equipment key from a drawing filename.
///
/// `"MLK PMT 10107 - H-001.pdf"` splits on the first `" - "`. Without that separator
/// the last whitespace-delimited token is the equipment number and the rest is the
/// PMT number (`"MLK PMT 10107 H-001.pdf"`).
pub fn parse_filename(filename: &str) -> EquipmentKey {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some((pmt, eq)) = stem.split_once(" - ") {
        return EquipmentKey::new(pmt.trim(), eq.trim());
    }

    let tokens: Vec<&str> = stem.split_whitespace().collect();
    match tokens.split_last() {
        Some((eq, rest)) => EquipmentKey::new(rest.join(" "), *eq),
        None => EquipmentKey::new(stem.trim(), ""),
    }
}
