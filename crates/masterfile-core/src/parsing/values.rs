use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;
use std::sync::LazyLock;

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?[0-9]*\.?[0-9]+").expect("valid number regex"));

/// Coerce an oracle value into a decimal.
///
/// Handles formats like:
/// - `150` / `1.2` (JSON numbers)
/// - `"150"`, `"1,5"` (decimal comma)
/// - `"1.00 MPa"`, `"≈ 120 °C"` -> first number in the text
/// - `null`, `""`, `"-"` -> None
pub fn to_decimal_maybe(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => match Decimal::from_str(&n.to_string()) {
            Ok(d) => Some(d),
            Err(_) => n.as_f64().map(f64_to_decimal),
        },
        Value::String(s) => parse_decimal_loose(s),
        _ => None,
    }
}

/// Find the first number in free text, accepting a decimal comma.
pub fn parse_decimal_loose(s: &str) -> Option<Decimal> {
    let s = s.trim().replace(',', ".");
    if s.is_empty() {
        return None;
    }
    let m = FIRST_NUMBER.find(&s)?;
    Decimal::from_str(m.as_str()).ok()
}

/// Convert f64 to Decimal, preserving reasonable precision.
///
/// Uses string round-trip to avoid floating-point artifacts
/// (e.g., 0.0035_f64 becoming 0.00349999...).
pub fn f64_to_decimal(f: f64) -> Decimal {
    let s = format!("{f}");
    s.parse::<Decimal>()
        .unwrap_or_else(|_| Decimal::try_from(f).unwrap_or_default())
}

/// Render a number for slide cells: integers without decimals, otherwise at most
/// three decimals with trailing zeros removed.
pub fn format_number(value: Option<Decimal>) -> String {
    match value {
        None => String::new(),
        Some(v) => {
            let rounded = v.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);
            rounded.normalize().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_json_number() {
        assert_eq!(to_decimal_maybe(&json!(150)), Some(dec!(150)));
        assert_eq!(to_decimal_maybe(&json!(1.2)), Some(dec!(1.2)));
    }

    #[test]
    fn test_string_with_unit() {
        assert_eq!(to_decimal_maybe(&json!("1.00 MPa")), Some(dec!(1.00)));
        assert_eq!(to_decimal_maybe(&json!("FV / 0,35")), Some(dec!(0.35)));
    }

    #[test]
    fn test_null_and_blank() {
        assert_eq!(to_decimal_maybe(&json!(null)), None);
        assert_eq!(to_decimal_maybe(&json!("")), None);
        assert_eq!(to_decimal_maybe(&json!("-")), None);
        assert_eq!(to_decimal_maybe(&json!({"v": 1})), None);
    }

    #[test]
    fn test_negative_temperature() {
        assert_eq!(parse_decimal_loose("-29 C"), Some(dec!(-29)));
    }

    #[test]
    fn f64_to_decimal_preserves_precision() {
        assert_eq!(f64_to_decimal(0.0035), dec!(0.0035));
        assert_eq!(f64_to_decimal(68.0), dec!(68));
        assert_eq!(f64_to_decimal(1.23), dec!(1.23));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(Some(dec!(150.0))), "150");
        assert_eq!(format_number(Some(dec!(1.2500))), "1.25");
        assert_eq!(format_number(Some(dec!(0.12345))), "0.123");
        assert_eq!(format_number(None), "");
    }
}
