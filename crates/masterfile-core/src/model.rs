use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::parsing::normalize::{norm_equipment, norm_pmt};

/// Fixed column layout of the `Masterfile` sheet (1-based, as in the spreadsheet).
pub mod columns {
    pub const NO: u32 = 1;
    pub const EQUIPMENT_NO: u32 = 2;
    pub const PMT_NO: u32 = 3;
    pub const DESCRIPTION: u32 = 4;
    pub const PARTS: u32 = 5;
    pub const PHASE: u32 = 6;
    pub const FLUID: u32 = 7;
    pub const TYPE: u32 = 8;
    pub const SPEC: u32 = 9;
    pub const GRADE: u32 = 10;
    pub const INSULATION: u32 = 11;
    pub const DESIGN_TEMP: u32 = 12;
    pub const DESIGN_PRESS: u32 = 13;
    pub const OPER_TEMP: u32 = 14;
    pub const OPER_PRESS: u32 = 15;

    /// Last column that belongs to the data region.
    pub const LAST: u32 = OPER_PRESS;
    /// Columns merged vertically across an equipment block.
    pub const IDENTITY: [u32; 4] = [NO, EQUIPMENT_NO, PMT_NO, DESCRIPTION];
}

/// Identifier of one piece of equipment: the PMT number plus the equipment (tag) number.
///
/// Equality and hashing use the normalized form only, so `"mlk pmt  10107"` and
/// `"MLK PMT 10107"` address the same rules and template rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentKey {
    pub pmt_no: String,
    pub equipment_no: String,
}

impl EquipmentKey {
    pub fn new(pmt_no: impl Into<String>, equipment_no: impl Into<String>) -> Self {
        EquipmentKey {
            pmt_no: pmt_no.into(),
            equipment_no: equipment_no.into(),
        }
    }

    pub fn normalized_pmt(&self) -> String {
        norm_pmt(&self.pmt_no)
    }

    pub fn normalized_equipment(&self) -> String {
        norm_equipment(&self.equipment_no)
    }

    /// True when raw spreadsheet values name this equipment.
    pub fn matches(&self, pmt_no: &str, equipment_no: &str) -> bool {
        norm_pmt(pmt_no) == self.normalized_pmt()
            && norm_equipment(equipment_no) == self.normalized_equipment()
    }
}

impl PartialEq for EquipmentKey {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.pmt_no, &other.equipment_no)
    }
}

impl Eq for EquipmentKey {}

impl Hash for EquipmentKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized_pmt().hash(state);
        self.normalized_equipment().hash(state);
    }
}

impl fmt::Display for EquipmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.pmt_no, self.equipment_no)
    }
}

/// One of the two process circuits of an exchanger-like vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Shell,
    Tube,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Shell => write!(f, "shell"),
            Side::Tube => write!(f, "tube"),
        }
    }
}

impl Side {
    pub fn from_str_loose(s: &str) -> Option<Side> {
        let lower = s.trim().to_lowercase();
        if lower.is_empty() {
            None
        } else if lower.contains("shell") {
            Some(Side::Shell)
        } else if lower.contains("tube") || lower.contains("header") || lower.contains("channel")
        {
            Some(Side::Tube)
        } else {
            None
        }
    }
}

/// A temperature / pressure pair for one side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub temp_c: Option<Decimal>,
    pub pressure_mpa: Option<Decimal>,
}

impl Condition {
    pub fn is_empty(&self) -> bool {
        self.temp_c.is_none() && self.pressure_mpa.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideConditions {
    pub shell: Condition,
    pub tube: Condition,
}

impl SideConditions {
    pub fn for_side(&self, side: Side) -> Condition {
        match side {
            Side::Shell => self.shell,
            Side::Tube => self.tube,
        }
    }

    /// Side-specific pair, or the shell pair when the side has neither value.
    pub fn for_side_or_shell(&self, side: Side) -> Condition {
        let condition = self.for_side(side);
        if condition.is_empty() {
            self.shell
        } else {
            condition
        }
    }

    /// Back-fill each missing value from the opposite side.
    fn complete_symmetric(&mut self) {
        fill_pair(&mut self.shell.temp_c, &mut self.tube.temp_c);
        fill_pair(&mut self.shell.pressure_mpa, &mut self.tube.pressure_mpa);
    }

    fn clear(&mut self) {
        *self = SideConditions::default();
    }
}

fn fill_pair(a: &mut Option<Decimal>, b: &mut Option<Decimal>) {
    match (a.is_some(), b.is_some()) {
        (false, true) => *a = *b,
        (true, false) => *b = *a,
        _ => {}
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fluids {
    pub shell: Option<String>,
    pub tube: Option<String>,
    pub header: Option<String>,
}

impl Fluids {
    /// Shell parts use the shell fluid; tube parts the tube fluid, else the header fluid.
    pub fn for_side(&self, side: Side) -> Option<&str> {
        match side {
            Side::Shell => self.shell.as_deref(),
            Side::Tube => self.tube.as_deref().or(self.header.as_deref()),
        }
    }
}

/// Design data block extracted from one drawing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignMetadata {
    pub fluids: Fluids,
    pub insulation: Option<String>,
    pub design: SideConditions,
    pub operating: SideConditions,
}

impl DesignMetadata {
    /// Apply symmetric side completion, then optionally discard every operating value
    /// (equipment whose operating conditions come from the template instead).
    pub fn normalized(mut self, force_null_operating: bool) -> Self {
        self.design.complete_symmetric();
        self.operating.complete_symmetric();
        if force_null_operating {
            self.operating.clear();
        }
        self
    }
}

/// One bill-of-materials entry as returned by the extraction oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomItem {
    pub part_label: String,
    pub material_raw: String,
    #[serde(default)]
    pub side: Option<Side>,
}

/// One structural part of an equipment as laid out in the reference template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePartPattern {
    /// Equipment description, shared by every part of the block.
    pub description: String,
    pub part: String,
    pub phase: Option<String>,
    pub type_name: Option<String>,
    /// Operating temperature baked into this template row, if numeric.
    pub oper_temp: Option<Decimal>,
    /// Operating pressure baked into this template row, if numeric.
    pub oper_press: Option<Decimal>,
}

/// Ordered part pattern for one equipment plus its representative template operating values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentPattern {
    pub parts: Vec<TemplatePartPattern>,
    pub template_oper_temp: Option<Decimal>,
    pub template_oper_press: Option<Decimal>,
}

impl EquipmentPattern {
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// One masterfile row. Identity fields are only set on the first row of a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRow {
    pub sequence_no: Option<u32>,
    pub equipment_no: Option<String>,
    pub pmt_no: Option<String>,
    pub description: Option<String>,
    pub part_label: String,
    pub phase: Option<String>,
    pub fluid: Option<String>,
    pub type_name: Option<String>,
    pub spec: Option<String>,
    pub grade: Option<String>,
    pub insulation_flag: String,
    pub design_temp: Option<Decimal>,
    pub design_press: Option<Decimal>,
    pub oper_temp: Option<Decimal>,
    pub oper_press: Option<Decimal>,
}
