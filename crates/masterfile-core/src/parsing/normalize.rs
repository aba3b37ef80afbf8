/// Normalize a PMT number for comparison: uppercase, single internal spaces.
pub fn norm_pmt(raw: &str) -> String {
    collapse_ws(&raw.to_uppercase())
}

/// Normalize an equipment (tag) number for comparison: uppercase, no whitespace at all.
pub fn norm_equipment(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Reduce a part label to lowercase ASCII alphanumerics ("Tube Bundle" -> "tubebundle").
pub fn norm_token(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Uppercase and collapse whitespace, including line breaks inside table cells.
pub fn norm_label(raw: &str) -> String {
    collapse_ws(&raw.to_uppercase())
}

pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
