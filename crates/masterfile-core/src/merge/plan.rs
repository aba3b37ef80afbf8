use rust_decimal::Decimal;
use serde::Serialize;

use crate::matching::{find_best_material, infer_side};
use crate::model::columns;
use crate::model::{BomItem, DesignMetadata, EquipmentKey, EquipmentPattern, OutputRow};
use crate::ooxml::sheet::{CellRange, CellRef, CellValue};
use crate::ooxml::styles::Alignment;
use crate::parsing::parse_spec_grade;

/// Values the masterfile treats as "no insulation recorded".
const NO_INSULATION: &[&str] = &["0", "-", "NIL", "NONE", "NO INSULATION"];

/// Where a new block lands in the output workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub start_row: u32,
    pub sequence_no: u32,
    /// Height of the workbook's first data row, applied to every new row.
    pub row_height: Option<Decimal>,
}

/// Formatting that goes with a block of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPatch {
    pub merges: Vec<CellRange>,
    pub row_heights: Vec<(u32, Decimal)>,
    pub alignments: Vec<(CellRef, Alignment)>,
}

/// Everything one append writes: the rows and their layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendPlan {
    pub key: EquipmentKey,
    pub start_row: u32,
    pub sequence_no: u32,
    pub rows: Vec<OutputRow>,
    #[serde(skip)]
    pub layout: LayoutPatch,
}

impl AppendPlan {
    pub fn end_row(&self) -> u32 {
        self.start_row + self.rows.len().saturating_sub(1) as u32
    }
}

/// Masterfile insulation column value for the extracted insulation text.
pub fn normalise_insulation(raw: Option<&str>) -> &'static str {
    let text = raw.map(str::trim).unwrap_or_default().to_uppercase();
    if text.is_empty() || NO_INSULATION.contains(&text.as_str()) {
        "YES"
    } else {
        "NO"
    }
}

/// Build the rows for one equipment from its template pattern and extracted data.
///
/// `design_meta` must already be normalized. With `use_template_operating` each
/// operating value comes from the part's template row, then the block's first
/// template value, then the extracted data.
pub fn plan_append(
    key: &EquipmentKey,
    pattern: &EquipmentPattern,
    design_meta: &DesignMetadata,
    bom_items: &[BomItem],
    use_template_operating: bool,
    placement: Placement,
) -> AppendPlan {
    let insulation = normalise_insulation(design_meta.insulation.as_deref());

    let rows: Vec<OutputRow> = pattern
        .parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let side = infer_side(&part.part);
            let material = find_best_material(bom_items, &part.part);
            let (spec, grade) = parse_spec_grade(material.map(|m| m.material_raw.as_str()));

            let design = design_meta.design.for_side_or_shell(side);
            let mut operating = design_meta.operating.for_side_or_shell(side);
            if use_template_operating {
                operating.temp_c = part
                    .oper_temp
                    .or(pattern.template_oper_temp)
                    .or(operating.temp_c);
                operating.pressure_mpa = part
                    .oper_press
                    .or(pattern.template_oper_press)
                    .or(operating.pressure_mpa);
            }

            let first = i == 0;
            OutputRow {
                sequence_no: first.then_some(placement.sequence_no),
                equipment_no: first.then(|| key.equipment_no.clone()),
                pmt_no: first.then(|| key.pmt_no.clone()),
                description: first
                    .then(|| part.description.clone())
                    .filter(|d| !d.is_empty()),
                part_label: part.part.clone(),
                phase: part.phase.clone(),
                fluid: design_meta.fluids.for_side(side).map(str::to_string),
                type_name: part.type_name.clone(),
                spec: non_empty(spec),
                grade: non_empty(grade),
                insulation_flag: insulation.to_string(),
                design_temp: design.temp_c,
                design_press: design.pressure_mpa,
                oper_temp: operating.temp_c,
                oper_press: operating.pressure_mpa,
            }
        })
        .collect();

    let layout = layout_for(placement, rows.len());
    AppendPlan {
        key: key.clone(),
        start_row: placement.start_row,
        sequence_no: placement.sequence_no,
        rows,
        layout,
    }
}

fn layout_for(placement: Placement, row_count: usize) -> LayoutPatch {
    let start = placement.start_row;
    let end = start + row_count.saturating_sub(1) as u32;
    let mut layout = LayoutPatch::default();

    if let Some(height) = placement.row_height {
        layout.row_heights = (start..=end).map(|row| (row, height)).collect();
    }
    if row_count > 1 {
        layout.merges = columns::IDENTITY
            .iter()
            .map(|&col| CellRange::new(CellRef::new(start, col), CellRef::new(end, col)))
            .collect();
        layout.alignments = vec![(
            CellRef::new(start, columns::DESCRIPTION),
            Alignment::DESCRIPTION,
        )];
    }
    layout
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Cell values of a row in column order (index 0 is column 1).
pub fn row_cells(row: &OutputRow) -> [CellValue; columns::LAST as usize] {
    [
        CellValue::opt_number(row.sequence_no.map(Decimal::from)),
        CellValue::opt_text(row.equipment_no.as_deref()),
        CellValue::opt_text(row.pmt_no.as_deref()),
        CellValue::opt_text(row.description.as_deref()),
        CellValue::text(row.part_label.as_str()),
        CellValue::opt_text(row.phase.as_deref()),
        CellValue::opt_text(row.fluid.as_deref()),
        CellValue::opt_text(row.type_name.as_deref()),
        CellValue::opt_text(row.spec.as_deref()),
        CellValue::opt_text(row.grade.as_deref()),
        CellValue::text(row.insulation_flag.as_str()),
        CellValue::opt_number(row.design_temp),
        CellValue::opt_number(row.design_press),
        CellValue::opt_number(row.oper_temp),
        CellValue::opt_number(row.oper_press),
    ]
}
