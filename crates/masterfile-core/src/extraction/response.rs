use serde_json::{Map, Value};
use tracing::warn;

use crate::error::MasterfileError;
use crate::model::{BomItem, Condition, DesignMetadata, Fluids, Side, SideConditions};
use crate::parsing::values::to_decimal_maybe;

/// Pull the JSON object out of an oracle answer.
///
/// Models wrap JSON in prose or code fences, so the text between the first `{` and the
/// last `}` is parsed. Anything that is not an object is `MalformedExtraction`.
pub fn recover_json_object(text: &str) -> Result<Map<String, Value>, MasterfileError> {
    let snippet = |s: &str| s.chars().take(200).collect::<String>();

    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Err(MasterfileError::MalformedExtraction(format!(
            "no JSON object in '{}'",
            snippet(text)
        )));
    };
    if end <= start {
        return Err(MasterfileError::MalformedExtraction(format!(
            "no JSON object in '{}'",
            snippet(text)
        )));
    }

    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(MasterfileError::MalformedExtraction(format!(
            "expected an object, got {other}"
        ))),
        Err(e) => Err(MasterfileError::MalformedExtraction(format!(
            "{e} in '{}'",
            snippet(&text[start..=end])
        ))),
    }
}

/// [`recover_json_object`], degrading to an empty object with a warning.
fn object_or_empty(text: &str) -> Map<String, Value> {
    recover_json_object(text).unwrap_or_else(|e| {
        warn!(error = %e, "treating oracle answer as empty");
        Map::new()
    })
}

/// Parse a design-data answer. Never fails: missing or malformed parts are `None`.
///
/// Side completion is not applied here, see [`DesignMetadata::normalized`].
pub fn parse_design_metadata(text: &str) -> DesignMetadata {
    let data = object_or_empty(text);

    let fluids = data.get("fluids");
    DesignMetadata {
        fluids: Fluids {
            shell: first_text_field(fluids, &["shell", "shell side", "shell_side"]),
            tube: first_text_field(fluids, &["tube", "tube side", "tube_side"]),
            header: text_field(fluids, "header"),
        },
        insulation: text_value(data.get("insulation")),
        design: side_conditions(data.get("design")),
        operating: side_conditions(data.get("operating")),
    }
}

fn side_conditions(block: Option<&Value>) -> SideConditions {
    SideConditions {
        shell: condition(block.and_then(|b| b.get("shell"))),
        tube: condition(block.and_then(|b| b.get("tube"))),
    }
}

fn condition(side: Option<&Value>) -> Condition {
    let number = |name: &str| side.and_then(|s| s.get(name)).and_then(to_decimal_maybe);
    Condition {
        temp_c: number("temp_c"),
        pressure_mpa: number("pressure_mpa"),
    }
}

fn text_field(parent: Option<&Value>, name: &str) -> Option<String> {
    text_value(parent?.get(name))
}

/// First non-blank value among spellings the model uses for the same key.
fn first_text_field(parent: Option<&Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| text_field(parent, name))
}

/// A non-blank string, or a number rendered as text.
fn text_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a BOM answer (`{"items": [...]}`). Entries with neither a label nor a
/// material are dropped; so is anything that is not an object.
pub fn parse_bom_items(text: &str) -> Vec<BomItem> {
    let data = object_or_empty(text);
    let Some(Value::Array(items)) = data.get("items") else {
        return Vec::new();
    };

    items
        .iter()
        .filter(|item| item.is_object())
        .filter_map(|item| {
            let field = |name: &str| {
                item.get(name)
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default()
            };
            let part_label = field("part_label");
            let material_raw = field("material_raw");
            if part_label.is_empty() && material_raw.is_empty() {
                return None;
            }
            let side = item
                .get("side")
                .and_then(Value::as_str)
                .and_then(Side::from_str_loose);
            Some(BomItem {
                part_label,
                material_raw,
                side,
            })
        })
        .collect()
}
