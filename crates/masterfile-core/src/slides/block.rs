use rust_decimal::Decimal;
use serde::Serialize;

use crate::model::columns;
use crate::model::EquipmentKey;
use crate::parsing::normalize::{norm_equipment, norm_pmt};
use crate::template::SheetView;

/// One masterfile row as the slide table needs it. Blank cells are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockRow {
    pub part: String,
    pub fluid: String,
    pub type_name: String,
    pub spec: String,
    pub grade: String,
    pub insulation: String,
    pub oper_temp: Option<Decimal>,
    pub oper_press: Option<Decimal>,
}

/// The most recent block of one equipment in the output workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquipmentBlock {
    pub start_row: u32,
    pub description: String,
    pub rows: Vec<BlockRow>,
}

/// Row that starts the last block declaring `key`.
pub fn latest_block_start(
    sheet: &impl SheetView,
    key: &EquipmentKey,
    first_data_row: u32,
) -> Option<u32> {
    (first_data_row..=sheet.max_row()).rev().find(|&row| {
        match (
            sheet.text(row, columns::EQUIPMENT_NO),
            sheet.text(row, columns::PMT_NO),
        ) {
            (Some(equipment), Some(pmt)) => key.matches(&pmt, &equipment),
            _ => false,
        }
    })
}

fn other_value(cell: Option<String>, normalize: fn(&str) -> String, target: &str) -> bool {
    cell.is_some_and(|v| normalize(&v) != target)
}

/// Read the latest block of `key`, `None` when the workbook has no row for it.
///
/// The block runs from its start row until a row names another equipment or is fully
/// blank. Trailing rows without a part, or with `-` as part, are dropped.
pub fn read_latest_block(
    sheet: &impl SheetView,
    key: &EquipmentKey,
    first_data_row: u32,
) -> Option<EquipmentBlock> {
    let start = latest_block_start(sheet, key, first_data_row)?;
    let target_equipment = key.normalized_equipment();
    let target_pmt = key.normalized_pmt();

    let mut rows = Vec::new();
    let mut keep = 0;
    for row in start..=sheet.max_row() {
        if row != start
            && (other_value(sheet.text(row, columns::EQUIPMENT_NO), norm_equipment, &target_equipment)
                || other_value(sheet.text(row, columns::PMT_NO), norm_pmt, &target_pmt))
        {
            break;
        }
        if sheet.is_row_blank(row) {
            break;
        }

        let text = |col| sheet.text(row, col).unwrap_or_default();
        let part = text(columns::PARTS);
        if !part.is_empty() && part != "-" {
            keep = rows.len() + 1;
        }
        rows.push(BlockRow {
            part,
            fluid: text(columns::FLUID),
            type_name: text(columns::TYPE),
            spec: text(columns::SPEC),
            grade: text(columns::GRADE),
            insulation: text(columns::INSULATION),
            oper_temp: sheet.number(row, columns::OPER_TEMP),
            oper_press: sheet.number(row, columns::OPER_PRESS),
        });
    }
    rows.truncate(keep);
    if rows.is_empty() {
        return None;
    }

    Some(EquipmentBlock {
        start_row: start,
        description: sheet.text(start, columns::DESCRIPTION).unwrap_or_default(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::dom::Document;
    use crate::ooxml::sheet::Worksheet;
    use rust_decimal_macros::dec;

    fn cell(r: &str, text: &str) -> String {
        format!(r#"<c r="{r}" t="inlineStr"><is><t>{text}</t></is></c>"#)
    }

    fn sheet(rows: &[(u32, &[(&str, &str)])]) -> Worksheet {
        let body: String = rows
            .iter()
            .map(|(r, cells)| {
                let cells: String = cells
                    .iter()
                    .map(|(col, text)| cell(&format!("{col}{r}"), text))
                    .collect();
                format!(r#"<row r="{r}">{cells}</row>"#)
            })
            .collect();
        let xml = format!(r#"<worksheet xmlns="urn:s"><sheetData>{body}</sheetData></worksheet>"#);
        let doc = Document::parse(&xml, "sheet.xml").unwrap();
        Worksheet::from_document(doc, &[], "sheet.xml").unwrap()
    }

    #[test]
    fn test_latest_block_wins() {
        let ws = sheet(&[
            (8, &[("B", "V-001"), ("C", "MLK PMT 10101"), ("D", "OLD"), ("E", "SHELL"), ("N", "10")]),
            (9, &[("B", "V-002"), ("C", "MLK PMT 10102"), ("E", "SHELL")]),
            (10, &[("B", "V-001"), ("C", "MLK PMT 10101"), ("D", "AIR RECEIVER"), ("E", "SHELL"), ("H", "CARBON STEEL"), ("N", "40")]),
            (11, &[("B", "V-001"), ("E", "HEAD"), ("K", "YES")]),
            (12, &[("E", "-")]),
            (13, &[("G", "WATER")]),
        ]);
        let key = EquipmentKey::new("MLK PMT 10101", "V-001");
        let block = read_latest_block(&ws, &key, 8).unwrap();

        assert_eq!(block.start_row, 10);
        assert_eq!(block.description, "AIR RECEIVER");
        let parts: Vec<&str> = block.rows.iter().map(|r| r.part.as_str()).collect();
        assert_eq!(parts, vec!["SHELL", "HEAD"]);
        assert_eq!(block.rows[0].oper_temp, Some(dec!(40)));
        assert_eq!(block.rows[1].insulation, "YES");
    }

    #[test]
    fn test_block_ends_at_blank_row() {
        let ws = sheet(&[
            (8, &[("B", "V-001"), ("C", "MLK PMT 10101"), ("E", "SHELL")]),
            (10, &[("E", "STRAY")]),
        ]);
        let block = read_latest_block(&ws, &EquipmentKey::new("MLK PMT 10101", "V-001"), 8).unwrap();
        assert_eq!(block.rows.len(), 1);
    }

    #[test]
    fn test_start_needs_both_numbers() {
        let ws = sheet(&[(8, &[("B", "V-001"), ("E", "SHELL")])]);
        let key = EquipmentKey::new("MLK PMT 10101", "V-001");
        assert_eq!(latest_block_start(&ws, &key, 8), None);
        assert!(read_latest_block(&ws, &key, 8).is_none());
    }
}
