use regex::Regex;
use std::sync::LazyLock;

use crate::parsing::normalize::collapse_ws;

static TRAILING_GRADE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?[A-Z0-9]*)\s*$").expect("valid trailing grade regex")
});

// "GRADE B", "GR. B", "GR 70" or "GR70". A separator is required before a letter code so
// that the rest of a longer word is never read as the grade.
static EMBEDDED_GRADE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:GRADE|GR)(?:\.\s*|\s+)([A-Z0-9]+)\b|\bGR(\d[A-Z0-9]*)\b")
        .expect("valid embedded grade regex")
});

static DASH_GR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-GR(?:ADE)?\.?\d*").expect("valid dash GR regex"));

static STANDALONE_GR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:GRADE|GR)\.?\d*\b").expect("valid standalone GR regex")
});

static TP_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(SA-?\d+)\s*-\s*TP[0-9A-Z]+.*$").expect("valid TP suffix regex")
});

const SPEC_TRIM: &[char] = &[' ', '-', '/', ','];

/// Split a raw material string into `(spec, grade)`.
///
/// Never fails: `None` or blank input gives `("", "")`, and an unparseable string comes
/// back uppercased as the spec with an empty grade.
///
/// - `"SA-516-70"` -> `("SA", "516-70")`
/// - `"A/SA 516 Gr 70"` -> `("SA 516", "70")`
/// - `"FE-560-Gr912/789L"` -> `("FE-560", "789L")`
/// - `"TY567 GR.8"` -> `("TY567", "8")`
/// - `"ASTM A106 GR.B"` -> `("A106", "B")`
pub fn parse_spec_grade(raw: Option<&str>) -> (String, String) {
    let Some(raw) = raw else {
        return (String::new(), String::new());
    };

    let s = collapse_ws(&raw.to_uppercase());
    if s.is_empty() {
        return (String::new(), String::new());
    }

    let (spec, grade) = if let Some((left, right)) = s.rsplit_once('/') {
        split_slash(left.trim(), right.trim())
    } else if let Some((left, right)) = s.split_once('-') {
        split_dash(&s, left.trim(), right.trim())
    } else {
        split_trailing_grade(&s)
    };

    let (spec, grade) = clean_up(spec, grade);
    if spec.is_empty() && grade.is_empty() {
        return (s, String::new());
    }
    (spec, grade)
}

/// `"<left>/<right>"`: the grade is the last token on the right. With a single right-hand
/// token the spec comes from the left side instead.
fn split_slash(left: &str, right: &str) -> (String, String) {
    let right_tokens: Vec<&str> = right.split_whitespace().collect();
    match right_tokens.as_slice() {
        [] => (left.to_string(), String::new()),
        [grade] => {
            let kept: Vec<&str> = left
                .split_whitespace()
                .filter(|t| !is_filler_token(t))
                .collect();
            let spec = if kept.is_empty() {
                left.to_string()
            } else {
                kept.join(" ")
            };
            (spec, grade.to_string())
        }
        [spec @ .., grade] => (spec.join(" "), grade.to_string()),
    }
}

fn is_filler_token(token: &str) -> bool {
    matches!(token, "A" | "M" | "GR" | "GR.") || token.starts_with("GR")
}

/// `"<left>-<right>"`: a single-word right side ("ZR312", "516-70") is the grade as is;
/// anything else falls back to the trailing numeric token of the whole string.
fn split_dash(whole: &str, left: &str, right: &str) -> (String, String) {
    let single_word = !right.is_empty() && !right.contains(char::is_whitespace);
    if single_word && (right.chars().any(char::is_alphabetic) || right.contains('-')) {
        (left.to_string(), right.to_string())
    } else {
        split_trailing_grade(whole)
    }
}

fn split_trailing_grade(s: &str) -> (String, String) {
    match TRAILING_GRADE.captures(s).and_then(|c| c.get(1)) {
        Some(m) => (
            s[..m.start()].trim_matches(SPEC_TRIM).to_string(),
            m.as_str().to_string(),
        ),
        None => (s.to_string(), String::new()),
    }
}

fn clean_up(spec: String, grade: String) -> (String, String) {
    let mut spec = spec.replace("A/SA", "SA").replace("A /SA", "SA");
    let mut grade = grade;

    if grade.is_empty() {
        let found = EMBEDDED_GRADE
            .captures(&spec)
            .and_then(|caps| {
                let code = caps.get(1).or_else(|| caps.get(2))?;
                Some((caps.get(0)?.range(), code.as_str().to_string()))
            });
        if let Some((range, code)) = found {
            grade = code;
            spec = format!("{} {}", &spec[..range.start], &spec[range.end..]);
        }
    }

    let spec = DASH_GR.replace_all(&spec, "");
    let spec = STANDALONE_GR.replace_all(&spec, "");
    let spec = collapse_ws(&spec);
    let spec = spec
        .trim_matches(SPEC_TRIM)
        .trim_end_matches('.')
        .trim_matches(SPEC_TRIM)
        .to_string();
    let spec = drop_standard_prefix(spec);
    let spec = TP_SUFFIX.replace(&spec, "$1").into_owned();

    let grade = grade
        .strip_prefix("GR.")
        .or_else(|| grade.strip_prefix("GR"))
        .unwrap_or(&grade)
        .trim_end_matches('.')
        .to_string();

    (spec, grade)
}

fn drop_standard_prefix(spec: String) -> String {
    for prefix in ["ASTM ", "ASME "] {
        if let Some(rest) = spec.strip_prefix(prefix) {
            let rest = rest.trim();
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> (String, String) {
        parse_spec_grade(Some(raw))
    }

    fn pair(spec: &str, grade: &str) -> (String, String) {
        (spec.to_string(), grade.to_string())
    }

    #[test]
    fn test_none_and_blank() {
        assert_eq!(parse_spec_grade(None), pair("", ""));
        assert_eq!(parse(""), pair("", ""));
        assert_eq!(parse("   "), pair("", ""));
    }

    #[test]
    fn test_dash_compound_grade() {
        assert_eq!(parse("SA-516-70"), pair("SA", "516-70"));
        assert_eq!(parse("sa-516-70n"), pair("SA", "516-70N"));
    }

    #[test]
    fn test_dash_alphabetic_grade() {
        assert_eq!(parse("PQ999-ZR312"), pair("PQ999", "ZR312"));
        assert_eq!(parse("JK981-IO827"), pair("JK981", "IO827"));
    }

    #[test]
    fn test_dash_numeric_right_side() {
        assert_eq!(parse("SA-516"), pair("SA", "516"));
    }

    #[test]
    fn test_dash_with_spaced_right_side() {
        assert_eq!(parse("SA-240 316L"), pair("SA-240", "316L"));
        assert_eq!(parse("SA-516 GR.70"), pair("SA-516", "70"));
    }

    #[test]
    fn test_slash_right_tokens() {
        assert_eq!(parse("A/SA 516 Gr 70"), pair("SA 516", "70"));
        assert_eq!(parse("SA 240 M 316L/ SA 240 316"), pair("SA 240", "316"));
    }

    #[test]
    fn test_slash_single_token_uses_left() {
        assert_eq!(parse("FE-560-Gr912/789L"), pair("FE-560", "789L"));
        assert_eq!(parse("ZY-982-GR.212/678K"), pair("ZY-982", "678K"));
        assert_eq!(parse("SA 516/GR.70"), pair("SA 516", "70"));
    }

    #[test]
    fn test_slash_grade_is_last_right_token() {
        for raw in ["X/ SA 240 304L", "A 240 / SA 240 TP 321", "CS/ SA-106 B"] {
            let last = raw.rsplit('/').next().unwrap().split_whitespace().last().unwrap();
            assert_eq!(parse(raw).1, last.to_uppercase(), "{raw}");
        }
    }

    #[test]
    fn test_bare_trailing_grade() {
        assert_eq!(parse("SA 516 GR 70"), pair("SA 516", "70"));
        assert_eq!(parse("SS316"), pair("SS", "316"));
        assert_eq!(parse("TY567 GR.8"), pair("TY567", "8"));
    }

    #[test]
    fn test_embedded_gr_recovers_grade() {
        assert_eq!(parse("ASTM A106 GR.B"), pair("A106", "B"));
        assert_eq!(parse("SA-106 GR.B"), pair("SA-106", "B"));
    }

    #[test]
    fn test_grade_word_is_filler() {
        assert_eq!(parse("ASTM A106 GRADE B"), pair("A106", "B"));
        assert_eq!(parse("SA-106 GRADE B"), pair("SA-106", "B"));
        assert_eq!(parse("SA 516 GRADE 70"), pair("SA 516", "70"));
        assert_eq!(parse("SA 516 Grade"), pair("SA 516", ""));
    }

    #[test]
    fn test_standard_prefix_dropped() {
        assert_eq!(parse("ASME SA-516 GR 70"), pair("SA-516", "70"));
    }

    #[test]
    fn test_tp_suffix_collapses() {
        assert_eq!(parse("SA312 - TP304/304L"), pair("SA312", "304L"));
    }

    #[test]
    fn test_unparseable_passthrough() {
        assert_eq!(parse("carbon  steel"), pair("CARBON STEEL", ""));
    }

    #[test]
    fn test_spec_starts_with_sa_and_grade_ends_with_digit() {
        let (spec, grade) = parse("SA-516-70");
        assert!(spec.starts_with("SA"));
        assert!(grade.chars().last().is_some_and(|c| c.is_ascii_digit()));
    }
}
