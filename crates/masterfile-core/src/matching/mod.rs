pub mod component;

use crate::model::{BomItem, Side};
use crate::parsing::normalize::norm_token;

const TUBE_KEYWORDS: &[&str] = &["tube", "bundle", "channel", "header"];

/// Infer which circuit a structural part belongs to from its label.
pub fn infer_side(part_label: &str) -> Side {
    let lower = part_label.to_lowercase();
    if TUBE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
        Side::Tube
    } else {
        Side::Shell
    }
}

/// Pick the BOM entry that supplies the material for a template part.
///
/// Precedence:
/// 1. exact match of normalized labels
/// 2. containment either way between normalized labels
/// 3. first entry tagged with the part's inferred side
/// 4. first entry
///
/// Returns `None` only when `bom_items` is empty.
pub fn find_best_material<'a>(bom_items: &'a [BomItem], part_label: &str) -> Option<&'a BomItem> {
    let target = norm_token(part_label);
    let side = infer_side(part_label);

    bom_items
        .iter()
        .find(|item| norm_token(&item.part_label) == target)
        .or_else(|| {
            bom_items.iter().find(|item| {
                let label = norm_token(&item.part_label);
                !label.is_empty()
                    && !target.is_empty()
                    && (label.contains(&target) || target.contains(&label))
            })
        })
        .or_else(|| bom_items.iter().find(|item| item.side == Some(side)))
        .or_else(|| bom_items.first())
}
