use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::MasterfileError;
use crate::ooxml::dom::{prefix_of, Document, Element, Node};
use crate::parsing::values::f64_to_decimal;

/// `A` -> 1, `O` -> 15, `AA` -> 27.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0u32, |acc, c| {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)
    })
}

/// 1 -> `A`, 27 -> `AA`.
pub fn column_letters(mut col: u32) -> String {
    let mut out = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        out.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    out.iter().rev().collect()
}

/// A 1-based cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        CellRef { row, col }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().replace('$', "");
        let split = s.find(|c: char| c.is_ascii_digit())?;
        let col = column_index(&s[..split])?;
        let row = s[split..].parse().ok()?;
        (row > 0).then_some(CellRef { row, col })
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// An inclusive rectangle of cells, as used by `mergeCell/@ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    pub fn new(start: CellRef, end: CellRef) -> Self {
        CellRange { start, end }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.split_once(':') {
            Some((a, b)) => Some(CellRange::new(CellRef::parse(a)?, CellRef::parse(b)?)),
            None => CellRef::parse(s).map(|c| CellRange::new(c, c)),
        }
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        (self.start.row..=self.end.row).contains(&cell.row)
            && (self.start.col..=self.end.col).contains(&cell.col)
    }

    pub fn intersects_row(&self, row: u32, first_col: u32, last_col: u32) -> bool {
        (self.start.row..=self.end.row).contains(&row)
            && self.start.col <= last_col
            && self.end.col >= first_col
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// The value of one cell, shared strings already resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(Decimal),
    Text(String),
    Bool(bool),
    Error(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    pub fn opt_text(s: Option<&str>) -> Self {
        s.map_or(CellValue::Empty, CellValue::text)
    }

    pub fn opt_number(n: Option<Decimal>) -> Self {
        n.map_or(CellValue::Empty, CellValue::Number)
    }

    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Display form: numbers without trailing zeros, booleans as `TRUE`/`FALSE`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(n.normalize().to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            CellValue::Error(e) => Some(e.clone()),
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// One `c` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    /// Index into `cellXfs`.
    pub style: Option<u32>,
    pub value: CellValue,
    /// Original element for cells that were never modified (keeps formulas and rich text).
    raw: Option<Element>,
}

/// One `row` element: its attributes (minus `r`) and its cells by column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    pub attrs: Vec<(String, String)>,
    pub cells: BTreeMap<u32, Cell>,
}

impl Row {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attr(&mut self, name: &str, value: String) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }
}

/// Elements that precede `mergeCells` in a worksheet.
const BEFORE_MERGE_CELLS: &[&str] = &[
    "sheetPr",
    "dimension",
    "sheetViews",
    "sheetFormatPr",
    "cols",
    "sheetData",
    "sheetCalcPr",
    "sheetProtection",
    "protectedRanges",
    "scenarios",
    "autoFilter",
    "sortState",
    "dataConsolidate",
    "customSheetViews",
];

/// Editable model of a worksheet part. Everything outside `sheetData`, `mergeCells`
/// and `dimension` is written back as parsed.
#[derive(Debug, Clone)]
pub struct Worksheet {
    part: String,
    doc: Document,
    rows: BTreeMap<u32, Row>,
    merges: Vec<CellRange>,
}

impl Worksheet {
    pub fn from_document(
        doc: Document,
        shared_strings: &[String],
        part: &str,
    ) -> Result<Self, MasterfileError> {
        let mut rows = BTreeMap::new();
        if let Some(sheet_data) = doc.root.child("sheetData") {
            let mut next_row = 1;
            for row_el in sheet_data.children_named("row") {
                let row_no = match row_el.attr("r") {
                    Some(r) => r
                        .parse::<u32>()
                        .map_err(|e| MasterfileError::xml(part, format!("row r='{r}': {e}")))?,
                    None => next_row,
                };
                next_row = row_no + 1;
                rows.insert(row_no, parse_row(row_el, row_no, shared_strings, part)?);
            }
        }

        let merges = doc
            .root
            .child("mergeCells")
            .map(|mc| {
                mc.children_named("mergeCell")
                    .filter_map(|m| m.attr("ref").and_then(CellRange::parse))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Worksheet {
            part: part.to_string(),
            doc,
            rows,
            merges,
        })
    }

    pub fn part(&self) -> &str {
        &self.part
    }

    /// Highest row that has a `row` element.
    pub fn max_row(&self) -> u32 {
        self.rows.keys().next_back().copied().unwrap_or(0)
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.rows.get(&row)?.cells.get(&col)
    }

    pub fn value(&self, row: u32, col: u32) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cell(row, col).map_or(&EMPTY, |c| &c.value)
    }

    pub fn style(&self, row: u32, col: u32) -> Option<u32> {
        self.cell(row, col).and_then(|c| c.style)
    }

    fn cell_mut(&mut self, row: u32, col: u32) -> &mut Cell {
        let row = self.rows.entry(row).or_default();
        row.attrs.retain(|(k, _)| k != "spans");
        row.cells.entry(col).or_default()
    }

    /// Set a value, keeping the cell's style.
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        let cell = self.cell_mut(row, col);
        cell.value = value;
        cell.raw = None;
    }

    pub fn set_style(&mut self, row: u32, col: u32, style: u32) {
        let cell = self.cell_mut(row, col);
        cell.style = Some(style);
        cell.raw = None;
    }

    /// True when none of `first..=last` holds a value.
    pub fn is_row_blank(&self, row: u32, first: u32, last: u32) -> bool {
        (first..=last).all(|col| self.value(row, col).is_blank())
    }

    pub fn row_height(&self, row: u32) -> Option<Decimal> {
        self.rows
            .get(&row)?
            .attr("ht")
            .and_then(|ht| Decimal::from_str(ht).ok())
    }

    pub fn set_row_height(&mut self, row: u32, height: Decimal) {
        let row = self.rows.entry(row).or_default();
        row.set_attr("ht", height.normalize().to_string());
        row.set_attr("customHeight", "1".to_string());
    }

    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    pub fn add_merge(&mut self, range: CellRange) {
        if !self.merges.contains(&range) {
            self.merges.push(range);
        }
    }

    pub fn retain_merges(&mut self, keep: impl FnMut(&CellRange) -> bool) {
        self.merges.retain(keep);
    }

    /// Rebuild the part with the current cells, merges and dimension.
    pub fn to_document(&self) -> Document {
        let mut doc = self.doc.clone();
        let prefix = prefix_of(&doc.root.name).to_string();
        let q = |local: &str| format!("{prefix}{local}");

        let mut sheet_data = Element::new(q("sheetData"));
        for (&row_no, row) in &self.rows {
            let mut row_el = Element::new(q("row")).with_attr("r", row_no.to_string());
            for (k, v) in &row.attrs {
                row_el.set_attr(k, v.as_str());
            }
            for (&col, cell) in &row.cells {
                row_el
                    .children
                    .push(Node::Element(cell_element(cell, CellRef::new(row_no, col), &q)));
            }
            sheet_data.children.push(Node::Element(row_el));
        }
        match doc.root.child_mut("sheetData") {
            Some(existing) => existing.children = sheet_data.children,
            None => doc.root.children.push(Node::Element(sheet_data)),
        }

        doc.root.remove_children("mergeCells");
        if !self.merges.is_empty() {
            let mut merge_el =
                Element::new(q("mergeCells")).with_attr("count", self.merges.len().to_string());
            for range in &self.merges {
                merge_el.children.push(Node::Element(
                    Element::new(q("mergeCell")).with_attr("ref", range.to_string()),
                ));
            }
            let insert_at = doc
                .root
                .children
                .iter()
                .rposition(|n| matches!(n, Node::Element(e) if BEFORE_MERGE_CELLS.contains(&e.local())))
                .map_or(doc.root.children.len(), |i| i + 1);
            doc.root.children.insert(insert_at, Node::Element(merge_el));
        }

        if let Some(dimension) = doc.root.child_mut("dimension") {
            dimension.set_attr("ref", self.dimension_ref());
        }
        doc
    }

    fn dimension_ref(&self) -> String {
        let max_col = self
            .rows
            .values()
            .filter_map(|r| r.cells.keys().next_back())
            .max()
            .copied()
            .unwrap_or(1);
        let max_row = self.max_row().max(1);
        let end = CellRef::new(max_row, max_col);
        if end == CellRef::new(1, 1) {
            "A1".to_string()
        } else {
            format!("A1:{end}")
        }
    }
}

fn parse_row(
    row_el: &Element,
    row_no: u32,
    shared_strings: &[String],
    part: &str,
) -> Result<Row, MasterfileError> {
    let mut row = Row {
        attrs: row_el
            .attrs
            .iter()
            .filter(|(k, _)| k != "r")
            .cloned()
            .collect(),
        cells: BTreeMap::new(),
    };

    let mut next_col = 1;
    for c in row_el.children_named("c") {
        let col = match c.attr("r") {
            Some(r) => CellRef::parse(r)
                .filter(|cr| cr.row == row_no)
                .ok_or_else(|| MasterfileError::xml(part, format!("bad cell reference '{r}'")))?
                .col,
            None => next_col,
        };
        next_col = col + 1;

        let style = c.attr("s").and_then(|s| s.parse().ok());
        let value = parse_cell_value(c, shared_strings);
        row.cells.insert(
            col,
            Cell {
                style,
                value,
                raw: Some(c.clone()),
            },
        );
    }
    Ok(row)
}

fn parse_cell_value(c: &Element, shared_strings: &[String]) -> CellValue {
    let v = c.child("v").map(Element::text);
    match c.attr("t").unwrap_or("n") {
        "s" => v
            .and_then(|idx| idx.trim().parse::<usize>().ok())
            .and_then(|idx| shared_strings.get(idx))
            .map_or(CellValue::Empty, |s| CellValue::text(s.as_str())),
        "inlineStr" => c
            .child("is")
            .map_or(CellValue::Empty, |is| CellValue::text(rich_text(is))),
        "str" => v.map_or(CellValue::Empty, CellValue::text),
        "b" => v.map_or(CellValue::Empty, |v| CellValue::Bool(v.trim() == "1")),
        "e" => v.map_or(CellValue::Empty, CellValue::Error),
        _ => v
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map_or(CellValue::Empty, |v| {
                let number = Decimal::from_str(&v)
                    .or_else(|_| Decimal::from_scientific(&v))
                    .ok()
                    .or_else(|| v.parse::<f64>().ok().map(f64_to_decimal));
                number.map_or(CellValue::Text(v), CellValue::Number)
            }),
    }
}

/// Text of a shared-string item or inline string: plain `t` or the `t` of each rich run.
pub fn rich_text(el: &Element) -> String {
    let mut out = String::new();
    for child in el.elements() {
        if child.is("t") {
            out.push_str(&child.text());
        } else if child.is("r") {
            if let Some(t) = child.child("t") {
                out.push_str(&t.text());
            }
        }
    }
    out
}

fn cell_element(cell: &Cell, at: CellRef, q: &impl Fn(&str) -> String) -> Element {
    if let Some(raw) = &cell.raw {
        let mut el = raw.clone();
        el.set_attr("r", at.to_string());
        return el;
    }

    let mut el = Element::new(q("c")).with_attr("r", at.to_string());
    if let Some(style) = cell.style {
        el.set_attr("s", style.to_string());
    }
    match &cell.value {
        CellValue::Empty => {}
        CellValue::Number(n) => {
            el = el.with_child(Element::new(q("v")).with_text(n.normalize().to_string()));
        }
        CellValue::Text(s) => {
            let mut t = Element::new(q("t")).with_text(s.as_str());
            if s.trim() != s {
                t.set_attr("xml:space", "preserve");
            }
            el.set_attr("t", "inlineStr");
            el = el.with_child(Element::new(q("is")).with_child(t));
        }
        CellValue::Bool(b) => {
            el.set_attr("t", "b");
            el = el.with_child(Element::new(q("v")).with_text(if *b { "1" } else { "0" }));
        }
        CellValue::Error(e) => {
            el.set_attr("t", "e");
            el = el.with_child(Element::new(q("v")).with_text(e.as_str()));
        }
    }
    el
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SHEET: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:O8"/><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row><row r="8" spans="1:15" ht="30" customHeight="1"><c r="A8" s="3"><v>1</v></c><c r="B8" s="4" t="inlineStr"><is><t>V-001</t></is></c><c r="N8" s="5"><f>1+1</f><v>2</v></c></row></sheetData><mergeCells count="1"><mergeCell ref="A1:O1"/></mergeCells><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#;

    fn sheet() -> Worksheet {
        let doc = Document::parse(SHEET, "xl/worksheets/sheet1.xml").unwrap();
        Worksheet::from_document(doc, &["MASTERFILE".to_string()], "xl/worksheets/sheet1.xml")
            .unwrap()
    }

    #[test]
    fn test_cell_refs() {
        assert_eq!(column_index("A"), Some(1));
        assert_eq!(column_index("O"), Some(15));
        assert_eq!(column_index("AA"), Some(27));
        assert_eq!(column_letters(28), "AB");
        assert_eq!(CellRef::parse("$D$12"), Some(CellRef::new(12, 4)));
        assert_eq!(CellRef::parse("12"), None);
        assert_eq!(
            CellRange::parse("A8:D10").unwrap().to_string(),
            "A8:D10"
        );
    }

    #[test]
    fn test_overlong_column_rejected() {
        assert_eq!(column_index("XFD"), Some(16_384));
        assert_eq!(column_index(&"Z".repeat(12)), None);
        assert_eq!(CellRef::parse(&format!("{}1", "Z".repeat(12))), None);
    }

    #[test]
    fn test_values_resolved() {
        let ws = sheet();
        assert_eq!(ws.value(1, 1), &CellValue::Text("MASTERFILE".into()));
        assert_eq!(ws.value(8, 1), &CellValue::Number(dec!(1)));
        assert_eq!(ws.value(8, 2).as_text().as_deref(), Some("V-001"));
        assert_eq!(ws.value(8, 14).as_number(), Some(dec!(2)));
        assert_eq!(ws.style(8, 2), Some(4));
        assert_eq!(ws.row_height(8), Some(dec!(30)));
        assert_eq!(ws.max_row(), 8);
        assert_eq!(ws.merges().len(), 1);
    }

    #[test]
    fn test_write_keeps_style_and_order() {
        let mut ws = sheet();
        ws.set_value(9, 2, CellValue::text("H-001"));
        ws.set_style(9, 2, 4);
        ws.set_value(8, 1, CellValue::Empty);
        ws.add_merge(CellRange::parse("A9:A10").unwrap());
        ws.set_row_height(9, dec!(30));

        let doc = ws.to_document();
        let names: Vec<&str> = doc.root.elements().map(|e| e.local()).collect();
        assert_eq!(
            names,
            vec!["dimension", "sheetData", "mergeCells", "pageMargins"]
        );
        assert_eq!(doc.root.child("dimension").unwrap().attr("ref"), Some("A1:N9"));

        let text = String::from_utf8(doc.to_bytes("sheet1.xml").unwrap()).unwrap();
        assert!(text.contains(r#"<c r="A8" s="3"/>"#));
        assert!(text.contains(r#"<c r="B9" s="4" t="inlineStr"><is><t>H-001</t></is></c>"#));
        assert!(text.contains("<f>1+1</f>"));
        assert!(text.contains(r#"<mergeCells count="2">"#));
        assert!(text.contains(r#"<row r="9" ht="30" customHeight="1">"#));
    }

    #[test]
    fn test_blank_rows() {
        let mut ws = sheet();
        assert!(!ws.is_row_blank(8, 1, 15));
        assert!(ws.is_row_blank(20, 1, 15));
        ws.set_value(8, 1, CellValue::Empty);
        ws.set_value(8, 2, CellValue::text(""));
        ws.set_value(8, 14, CellValue::Empty);
        assert!(ws.is_row_blank(8, 1, 15));
    }

    #[test]
    fn test_merges_removed_when_empty() {
        let mut ws = sheet();
        ws.retain_merges(|_| false);
        let doc = ws.to_document();
        assert!(doc.root.child("mergeCells").is_none());
    }
}
