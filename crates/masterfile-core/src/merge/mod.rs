pub mod plan;

use std::path::Path;

use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::MasterfileConfig;
use crate::error::MasterfileError;
use crate::lock::WorkbookLock;
use crate::model::columns;
use crate::model::{BomItem, DesignMetadata, EquipmentKey};
use crate::ooxml::sheet::{CellValue, Worksheet};
use crate::ooxml::workbook::XlsxWorkbook;
use crate::parsing::parse_filename;
use crate::rules::TemplateRuleStore;
use crate::template::{extract_equipment_pattern, load_template, SheetView};

pub use plan::{normalise_insulation, plan_append, AppendPlan, LayoutPatch, Placement};

/// Configuration and rules shared by appends and slide syncs.
#[derive(Debug, Clone, Copy)]
pub struct MergeContext<'a> {
    pub config: &'a MasterfileConfig,
    pub rules: &'a TemplateRuleStore,
}

/// What one append did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AppendOutcome {
    Appended {
        key: EquipmentKey,
        sequence_no: u32,
        start_row: u32,
        rows: usize,
    },
    /// Nothing was written.
    Skipped { key: EquipmentKey, reason: String },
}

/// Append the block for one drawing to the output workbook, creating it from the
/// template on first use.
///
/// A key without a template block is skipped, not an error. Every call appends a
/// new block, even when the key is already present.
pub fn append_equipment(
    ctx: MergeContext<'_>,
    workbook_path: &Path,
    drawing_filename: &str,
    design_meta: &DesignMetadata,
    bom_items: &[BomItem],
) -> Result<AppendOutcome, MasterfileError> {
    let key = parse_filename(drawing_filename);
    let config = ctx.config;

    let template = load_template(&config.template_path, &config.sheet_name)?;
    let pattern = extract_equipment_pattern(&template, &key, config.first_data_row);
    if pattern.is_empty() {
        let reason = MasterfileError::NotFound {
            pmt_no: key.pmt_no.clone(),
            equipment_no: key.equipment_no.clone(),
        };
        info!(key = %key, "{reason}, skipping");
        return Ok(AppendOutcome::Skipped {
            key,
            reason: reason.to_string(),
        });
    }

    let _lock = WorkbookLock::acquire(workbook_path)?;
    ensure_output_workbook(config, workbook_path)?;
    let mut workbook = XlsxWorkbook::open(workbook_path, &config.sheet_name)?;

    let first = config.first_data_row;
    let placement = Placement {
        start_row: first_empty_row(workbook.sheet(), first),
        sequence_no: next_sequence_no(workbook.sheet(), first),
        row_height: workbook.sheet().row_height(first),
    };
    let meta = design_meta
        .clone()
        .normalized(ctx.rules.force_null_operating(&key));
    let plan = plan_append(
        &key,
        &pattern,
        &meta,
        bom_items,
        ctx.rules.use_template_operating(&key),
        placement,
    );

    apply_plan(&mut workbook, &plan, first)?;
    workbook.save()?;

    info!(
        key = %key,
        sequence_no = plan.sequence_no,
        rows = %format!("{}-{}", plan.start_row, plan.end_row()),
        path = %workbook_path.display(),
        "equipment appended"
    );
    Ok(AppendOutcome::Appended {
        key,
        sequence_no: plan.sequence_no,
        start_row: plan.start_row,
        rows: plan.rows.len(),
    })
}

/// Create the output workbook from the template unless it exists. Returns whether it
/// was created.
///
/// The copy keeps every style, header and row height; values in the data region are
/// cleared and merges inside it dropped.
pub fn ensure_output_workbook(
    config: &MasterfileConfig,
    workbook_path: &Path,
) -> Result<bool, MasterfileError> {
    if workbook_path.exists() {
        return Ok(false);
    }
    if !config.template_path.exists() {
        return Err(MasterfileError::MissingTemplateFile(
            config.template_path.clone(),
        ));
    }

    let mut workbook = XlsxWorkbook::open(&config.template_path, &config.sheet_name)?;
    let first = config.first_data_row;
    let sheet = workbook.sheet_mut();

    let last_data_row = (first..=sheet.max_row())
        .filter(|&row| !sheet.is_row_blank(row, 1, columns::LAST))
        .last();
    if let Some(last) = last_data_row {
        for row in first..=last {
            for col in 1..=columns::LAST {
                if sheet.cell(row, col).is_some() {
                    sheet.set_value(row, col, CellValue::Empty);
                }
            }
        }
    }
    sheet.retain_merges(|m| m.start.row < first);
    workbook.drop_calc_chain()?;
    workbook.save_as(workbook_path)?;

    info!(
        path = %workbook_path.display(),
        template = %config.template_path.display(),
        "output workbook created"
    );
    Ok(true)
}

/// One past the largest number in the `No` column, or 1 for an empty masterfile.
pub fn next_sequence_no(sheet: &Worksheet, first_data_row: u32) -> u32 {
    let max = (first_data_row..=sheet.max_row())
        .filter_map(|row| sheet.number(row, columns::NO))
        .filter_map(|n| n.trunc().to_u32())
        .max()
        .unwrap_or(0);
    max + 1
}

/// First data row with nothing in the masterfile columns and outside any merge.
pub fn first_empty_row(sheet: &Worksheet, first_data_row: u32) -> u32 {
    let max_row = sheet.max_row();
    (first_data_row..=max_row)
        .find(|&row| {
            !sheet
                .merges()
                .iter()
                .any(|m| m.intersects_row(row, 1, columns::LAST))
                && sheet.is_row_blank(row, 1, columns::LAST)
        })
        .unwrap_or_else(|| (max_row + 1).max(first_data_row))
}

/// Write a plan's rows and layout into the workbook.
///
/// New cells take the style of the same column in the first data row.
pub fn apply_plan(
    workbook: &mut XlsxWorkbook,
    plan: &AppendPlan,
    first_data_row: u32,
) -> Result<(), MasterfileError> {
    let base_styles: Vec<Option<u32>> = (1..=columns::LAST)
        .map(|col| workbook.sheet().style(first_data_row, col))
        .collect();

    let sheet = workbook.sheet_mut();
    for (i, row) in plan.rows.iter().enumerate() {
        let r = plan.start_row + i as u32;
        for (col, value) in (1..=columns::LAST).zip(plan::row_cells(row)) {
            sheet.set_value(r, col, value);
            if let Some(style) = base_styles[(col - 1) as usize] {
                sheet.set_style(r, col, style);
            }
        }
    }

    let layout = &plan.layout;
    for &(row, height) in &layout.row_heights {
        sheet.set_row_height(row, height);
    }
    for range in &layout.merges {
        sheet.add_merge(*range);
    }
    for &(cell, alignment) in &layout.alignments {
        let base = workbook.sheet().style(cell.row, cell.col);
        if let Some(style) = workbook.aligned_style(base, alignment)? {
            workbook.sheet_mut().set_style(cell.row, cell.col, style);
        }
    }

    debug!(
        start_row = plan.start_row,
        merges = layout.merges.len(),
        "plan applied"
    );
    Ok(())
}
