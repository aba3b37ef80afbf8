use std::path::Path;
use std::str::FromStr;

use calamine::{Data, Range, Reader, Xlsx};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::MasterfileError;
use crate::model::columns;
use crate::model::{EquipmentKey, EquipmentPattern, TemplatePartPattern};
use crate::ooxml::sheet::Worksheet;
use crate::parsing::values::f64_to_decimal;

/// Read access to a masterfile-shaped sheet, 1-based like the spreadsheet itself.
pub trait SheetView {
    /// Last row that may hold data.
    fn max_row(&self) -> u32;

    /// Trimmed display text, `None` for blank cells.
    fn text(&self, row: u32, col: u32) -> Option<String>;

    /// Numeric value, also accepting numbers stored as text.
    fn number(&self, row: u32, col: u32) -> Option<Decimal>;

    /// Equipment and PMT numbers declared on a row, when either is present.
    fn declared_key(&self, row: u32) -> Option<(String, String)> {
        let equipment = self.text(row, columns::EQUIPMENT_NO);
        let pmt = self.text(row, columns::PMT_NO);
        if equipment.is_none() && pmt.is_none() {
            return None;
        }
        Some((pmt.unwrap_or_default(), equipment.unwrap_or_default()))
    }

    fn is_row_blank(&self, row: u32) -> bool {
        (1..=columns::LAST).all(|col| self.text(row, col).is_none())
    }
}

/// A worksheet read through calamine.
pub struct CalamineSheet {
    range: Range<Data>,
}

impl CalamineSheet {
    pub fn new(range: Range<Data>) -> Self {
        CalamineSheet { range }
    }

    fn cell(&self, row: u32, col: u32) -> Option<&Data> {
        if row == 0 || col == 0 {
            return None;
        }
        self.range.get_value((row - 1, col - 1))
    }
}

impl SheetView for CalamineSheet {
    fn max_row(&self) -> u32 {
        self.range.end().map_or(0, |(row, _)| row + 1)
    }

    fn text(&self, row: u32, col: u32) -> Option<String> {
        let s = match self.cell(row, col)? {
            Data::Empty => return None,
            Data::String(s) => s.trim().to_string(),
            Data::Float(f) => f64_to_decimal(*f).normalize().to_string(),
            Data::Int(i) => i.to_string(),
            Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
            other => other.to_string().trim().to_string(),
        };
        (!s.is_empty()).then_some(s)
    }

    fn number(&self, row: u32, col: u32) -> Option<Decimal> {
        match self.cell(row, col)? {
            Data::Float(f) => Some(f64_to_decimal(*f)),
            Data::Int(i) => Some(Decimal::from(*i)),
            Data::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }
}

impl SheetView for Worksheet {
    fn max_row(&self) -> u32 {
        Worksheet::max_row(self)
    }

    fn text(&self, row: u32, col: u32) -> Option<String> {
        self.value(row, col)
            .as_text()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn number(&self, row: u32, col: u32) -> Option<Decimal> {
        let value = self.value(row, col);
        value
            .as_number()
            .or_else(|| Decimal::from_str(value.as_text()?.trim()).ok())
    }
}

/// Fail with `MissingTemplateFile` unless the reference template is on disk.
pub fn require_template(path: &Path) -> Result<(), MasterfileError> {
    if path.exists() {
        Ok(())
    } else {
        Err(MasterfileError::MissingTemplateFile(path.to_path_buf()))
    }
}

/// Open the reference template's masterfile sheet.
pub fn load_template(path: &Path, sheet_name: &str) -> Result<CalamineSheet, MasterfileError> {
    require_template(path)?;
    open_sheet(path, sheet_name)
}

/// Open one sheet of any xlsx workbook for reading.
pub fn open_sheet(path: &Path, sheet_name: &str) -> Result<CalamineSheet, MasterfileError> {
    let mut workbook: Xlsx<_> =
        calamine::open_workbook(path).map_err(|e: calamine::XlsxError| MasterfileError::Workbook {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if !workbook.sheet_names().iter().any(|name| name == sheet_name) {
        return Err(MasterfileError::SheetNotFound {
            sheet: sheet_name.to_string(),
            path: path.to_path_buf(),
        });
    }
    let range = workbook
        .worksheet_range(sheet_name)
        .map_err(|e| MasterfileError::Workbook {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    Ok(CalamineSheet::new(range))
}

/// Locate the row block describing `key` and turn it into a part pattern.
///
/// The block starts at the first row whose equipment and PMT numbers match the key
/// and runs until a row declares another key or has no part label. An empty pattern
/// means the template does not know this equipment.
pub fn extract_equipment_pattern(
    sheet: &impl SheetView,
    key: &EquipmentKey,
    first_data_row: u32,
) -> EquipmentPattern {
    let max_row = sheet.max_row();
    let start = (first_data_row..=max_row).find(|&row| {
        sheet
            .declared_key(row)
            .is_some_and(|(pmt, equipment)| key.matches(&pmt, &equipment))
    });
    let Some(start) = start else {
        debug!(key = %key, "no template block");
        return EquipmentPattern::default();
    };

    let description = sheet.text(start, columns::DESCRIPTION).unwrap_or_default();
    let mut parts = Vec::new();
    for row in start..=max_row {
        if row != start {
            if let Some((pmt, equipment)) = sheet.declared_key(row) {
                if !key.matches(&pmt, &equipment) {
                    break;
                }
            }
        }
        let Some(part) = sheet.text(row, columns::PARTS) else {
            break;
        };
        parts.push(TemplatePartPattern {
            description: description.clone(),
            part,
            phase: sheet.text(row, columns::PHASE),
            type_name: sheet.text(row, columns::TYPE),
            oper_temp: sheet.number(row, columns::OPER_TEMP),
            oper_press: sheet.number(row, columns::OPER_PRESS),
        });
    }

    let pattern = EquipmentPattern {
        template_oper_temp: parts.iter().find_map(|p| p.oper_temp),
        template_oper_press: parts.iter().find_map(|p| p.oper_press),
        parts,
    };
    debug!(
        key = %key,
        start_row = start,
        parts = pattern.parts.len(),
        oper_temp = ?pattern.template_oper_temp,
        oper_press = ?pattern.template_oper_press,
        "template block extracted"
    );
    pattern
}
