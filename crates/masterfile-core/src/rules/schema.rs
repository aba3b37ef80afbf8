use serde::{Deserialize, Serialize};

use crate::model::EquipmentKey;

/// A rule table: per-equipment extraction hints, template operating flags and slide positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: String,
    pub equipment: Vec<EquipmentRuleDef>,
}

/// Everything known about one equipment key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentRuleDef {
    pub pmt_no: String,
    pub equipment_no: String,
    #[serde(default)]
    pub design: Option<DesignRule>,
    #[serde(default)]
    pub bom: Option<BomRule>,
    /// Operating temperature/pressure come from the template rows, not from the drawing.
    #[serde(default)]
    pub use_template_operating: bool,
    /// Zero-based slide in the companion deck.
    #[serde(default)]
    pub slide_index: Option<usize>,
}

impl EquipmentRuleDef {
    pub fn key(&self) -> EquipmentKey {
        EquipmentKey::new(self.pmt_no.clone(), self.equipment_no.clone())
    }
}

/// Overrides for the design-data extraction of one drawing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignRule {
    /// Appended to the base design instruction.
    #[serde(default)]
    pub extra_prompt: Option<String>,
    /// Discard every extracted operating value.
    #[serde(default)]
    pub force_null_operating: bool,
}

/// Overrides for the bill-of-materials extraction of one drawing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomRule {
    #[serde(default)]
    pub extra_prompt: Option<String>,
}
