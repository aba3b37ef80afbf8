use crate::parsing::normalize::norm_label;

/// Component labels that slide tables and the masterfile spell differently.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("TOP HEAD", &["HEAD", "TOPHEAD", "DISHED END", "DISHEDEND"]),
    ("BOTTOM HEAD", &["HEAD", "BOTTOMHEAD", "DISHED END", "DISHEDEND"]),
    ("HEAD", &["TOP HEAD", "BOTTOM HEAD", "DISHED END", "DISHEDEND"]),
    ("CHANNEL", &["HEAD", "CHANNEL HEAD", "CHANNELHEAD"]),
    ("TUBE BUNDLE", &["TUBE", "BUNDLE", "TUBEBUNDLE"]),
];

/// Match a slide table's component cell against masterfile part labels.
///
/// Exact normalized match first, then containment either way, then the synonym groups.
pub fn match_component<'a, T>(
    component: &str,
    rows: &'a [T],
    label: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    let comp = norm_label(component);

    if let Some(row) = rows.iter().find(|r| norm_label(label(r)) == comp) {
        return Some(row);
    }

    if !comp.is_empty() {
        if let Some(row) = rows.iter().find(|r| {
            let part = norm_label(label(r));
            !part.is_empty() && (part.contains(&comp) || comp.contains(&part))
        }) {
            return Some(row);
        }
    }

    for (key, synonyms) in SYNONYMS {
        let in_group = |text: &str| text == *key || synonyms.iter().any(|s| text.contains(s));
        if !in_group(&comp) {
            continue;
        }
        if let Some(row) = rows.iter().find(|r| in_group(&norm_label(label(r)))) {
            return Some(row);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find<'a>(component: &str, parts: &'a [&'a str]) -> Option<&'a str> {
        match_component(component, parts, |p| *p).copied()
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(find("Shell", &["SHELL", "HEAD"]), Some("SHELL"));
    }

    #[test]
    fn test_multiline_cell() {
        assert_eq!(
            find("TUBE\nBUNDLE", &["Shell", "Tube Bundle"]),
            Some("Tube Bundle")
        );
    }

    #[test]
    fn test_containment() {
        assert_eq!(find("TOP HEAD", &["Shell", "Head"]), Some("Head"));
    }

    #[test]
    fn test_synonym_dished_end() {
        assert_eq!(
            find("DISHED END", &["Shell", "Bottom Head"]),
            Some("Bottom Head")
        );
    }

    #[test]
    fn test_synonym_tube_bundle() {
        assert_eq!(find("TUBE BUNDLE", &["Shell", "Tubes"]), Some("Tubes"));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(find("NOZZLE", &["Shell", "Head"]), None);
        assert_eq!(find("", &["Shell"]), None);
    }
}
