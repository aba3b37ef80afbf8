//! Synthesised template workbook and slide deck for tests.
//!
//! Only uses `zip` and `std` so integration tests can include it by path.
#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const SHEET_NAME: &str = "Masterfile";
pub const FIRST_DATA_ROW: u32 = 8;

/// Reference blocks starting at row 8: V-001 (rows 8-9), V-002 (10-11), H-001 (12-14).
pub const TEMPLATE_ROWS: &[[&str; 15]] = &[
    ["1", "V-001", "MLK PMT 10101", "AIR RECEIVER", "SHELL", "GAS", "AIR", "CARBON STEEL", "SA", "516-70", "NO", "150", "1.2", "40", "0.8"],
    ["", "", "", "", "HEAD", "GAS", "AIR", "CARBON STEEL", "SA", "516-70", "NO", "150", "1.2", "40", "0.8"],
    ["2", "V-002", "MLK PMT 10102", "KNOCK OUT DRUM", "SHELL", "LIQUID", "WATER", "CARBON STEEL", "SA", "516-70", "NO", "120", "1", "35", "0.6"],
    ["", "", "", "", "HEAD", "LIQUID", "WATER", "CARBON STEEL", "SA", "516-70", "NO", "120", "1", "35", "0.6"],
    ["3", "H-001", "MLK PMT 10107", "HEAT EXCHANGER", "SHELL", "LIQUID", "CRUDE", "CARBON STEEL", "SA", "516-70", "NO", "200", "1.5", "60", "0.5"],
    ["", "", "", "", "CHANNEL", "GAS", "STEAM", "STAINLESS STEEL", "SA", "240-304", "NO", "250", "2", "45", "0.3"],
    ["", "", "", "", "TUBE BUNDLE", "GAS", "STEAM", "STAINLESS STEEL", "SA", "213-TP304", "NO", "250", "2", "", ""],
];

/// Row spans of the template blocks, merged over the identity columns.
const TEMPLATE_BLOCKS: &[(u32, u32)] = &[(8, 9), (10, 11), (12, 14)];

const HEADERS: [&str; 15] = [
    "No", "Equipment No", "PMT No", "Description", "Parts", "Phase", "Fluid", "Type", "Spec",
    "Grade", "Insulation", "Design Temp", "Design Press", "Oper Temp", "Oper Press",
];

const NUMERIC_COLUMNS: [usize; 5] = [1, 12, 13, 14, 15];

pub const PICTURE_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n equipment sketch";
pub const LOGO_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n company logo";

/// Geometry of the large picture on slide 1: (x, y, cx, cy) in EMU.
pub const PICTURE_BOX: (i64, i64, i64, i64) = (457200, 1500000, 4000000, 3000000);

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub fn zip_parts(parts: &[(&str, String)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn zip_binary(parts: &[(&str, String)], binary: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    for (name, content) in binary {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn col_letter(col: usize) -> char {
    (b'A' + (col as u8 - 1)) as char
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn data_cell(row: u32, col: usize, value: &str) -> String {
    let r = format!("{}{row}", col_letter(col));
    let style = if col <= 4 { 1 } else { 2 };
    if value.is_empty() {
        format!(r#"<c r="{r}" s="{style}"/>"#)
    } else if NUMERIC_COLUMNS.contains(&col) {
        format!(r#"<c r="{r}" s="{style}"><v>{value}</v></c>"#)
    } else {
        format!(
            r#"<c r="{r}" s="{style}" t="inlineStr"><is><t>{}</t></is></c>"#,
            escape(value)
        )
    }
}

fn masterfile_sheet(rows: &[[&str; 15]]) -> String {
    let mut data = String::new();
    data.push_str(r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row>"#);
    data.push_str(r#"<row r="7" spans="1:15">"#);
    for col in 1..=15 {
        data.push_str(&format!(r#"<c r="{}7" t="s"><v>{col}</v></c>"#, col_letter(col)));
    }
    data.push_str("</row>");

    for (i, values) in rows.iter().enumerate() {
        let row = FIRST_DATA_ROW + i as u32;
        data.push_str(&format!(
            r#"<row r="{row}" spans="1:15" ht="30" customHeight="1">"#
        ));
        for (j, value) in values.iter().enumerate() {
            data.push_str(&data_cell(row, j + 1, value));
        }
        data.push_str("</row>");
    }

    let mut merges = vec!["A1:O1".to_string()];
    for &(start, end) in TEMPLATE_BLOCKS.iter().filter(|(s, _)| (*s as usize) < FIRST_DATA_ROW as usize + rows.len()) {
        for col in 1..=4 {
            let c = col_letter(col);
            merges.push(format!("{c}{start}:{c}{end}"));
        }
    }
    let merge_xml: String = merges
        .iter()
        .map(|m| format!(r#"<mergeCell ref="{m}"/>"#))
        .collect();

    let last_row = FIRST_DATA_ROW as usize + rows.len() - 1;
    format!(
        r#"{DECL}<worksheet xmlns="{NS_MAIN}" xmlns:r="{NS_R}"><dimension ref="A1:O{last_row}"/><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetFormatPr defaultRowHeight="15"/><sheetData>{data}</sheetData><mergeCells count="{}">{merge_xml}</mergeCells><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#,
        merges.len()
    )
}

/// Workbook with a `Cover` sheet and the `Masterfile` sheet holding `rows` from row 8.
pub fn workbook_bytes(rows: &[[&str; 15]]) -> Vec<u8> {
    let content_types = format!(
        r#"{DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/></Types>"#
    );
    let root_rels = format!(
        r#"{DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    );
    let workbook = format!(
        r#"{DECL}<workbook xmlns="{NS_MAIN}" xmlns:r="{NS_R}"><sheets><sheet name="Cover" sheetId="1" r:id="rId1"/><sheet name="{SHEET_NAME}" sheetId="2" r:id="rId2"/></sheets></workbook>"#
    );
    let workbook_rels = format!(
        r#"{DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{REL}/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="{REL}/styles" Target="styles.xml"/><Relationship Id="rId4" Type="{REL}/sharedStrings" Target="sharedStrings.xml"/><Relationship Id="rId5" Type="{REL}/calcChain" Target="calcChain.xml"/></Relationships>"#
    );
    let cover = format!(
        r#"{DECL}<worksheet xmlns="{NS_MAIN}"><sheetData><row r="1"><c r="A1" t="inlineStr"><is><t>Cover</t></is></c></row></sheetData></worksheet>"#
    );
    let styles = format!(
        r#"{DECL}<styleSheet xmlns="{NS_MAIN}"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border><border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1" applyAlignment="1"><alignment horizontal="center" vertical="center" wrapText="1"/></xf><xf numFmtId="0" fontId="0" fillId="0" borderId="1" xfId="0" applyBorder="1"/></cellXfs></styleSheet>"#
    );
    let strings: String = std::iter::once("MASTERFILE")
        .chain(HEADERS)
        .map(|s| format!("<si><t>{s}</t></si>"))
        .collect();
    let shared_strings = format!(
        r#"{DECL}<sst xmlns="{NS_MAIN}" count="16" uniqueCount="16">{strings}</sst>"#
    );
    let calc_chain = format!(r#"{DECL}<calcChain xmlns="{NS_MAIN}"><c r="A8" i="2"/></calcChain>"#);

    zip_parts(&[
        ("[Content_Types].xml", content_types),
        ("_rels/.rels", root_rels),
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", workbook_rels),
        ("xl/worksheets/sheet1.xml", cover),
        ("xl/worksheets/sheet2.xml", masterfile_sheet(rows)),
        ("xl/styles.xml", styles),
        ("xl/sharedStrings.xml", shared_strings),
        ("xl/calcChain.xml", calc_chain),
    ])
}

pub fn masterfile_template_bytes() -> Vec<u8> {
    workbook_bytes(TEMPLATE_ROWS)
}

fn table_cell(text: &str) -> String {
    if text.is_empty() {
        r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:endParaRPr lang="en-US"/></a:p></a:txBody><a:tcPr/></a:tc>"#.to_string()
    } else {
        format!(
            r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US" sz="1000"/><a:t>{}</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>"#,
            escape(text)
        )
    }
}

/// Material table: two header rows, then SHELL, TOP HEAD and NOZZLE component rows.
fn material_table() -> String {
    let rows: [[&str; 9]; 5] = [
        ["FLUID", "COMPONENT", "MATERIAL", "", "", "", "", "OPERATING", ""],
        ["", "", "", "TYPE", "SPEC", "GRADE", "INSULATION", "TEMP", "PRESS"],
        ["", "SHELL", "", "", "", "", "", "", ""],
        ["", "TOP HEAD", "", "", "", "", "", "", ""],
        ["OLD", "NOZZLE", "", "OLD", "OLD", "OLD", "OLD", "OLD", "OLD"],
    ];
    let grid: String = (0..9).map(|_| r#"<a:gridCol w="914400"/>"#).collect();
    let body: String = rows
        .iter()
        .map(|row| {
            let cells: String = row.iter().map(|t| table_cell(t)).collect();
            format!(r#"<a:tr h="228600">{cells}</a:tr>"#)
        })
        .collect();
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="3" name="Table 2"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="457200" y="4800000"/><a:ext cx="8229600" cy="1143000"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1" bandRow="1"/><a:tblGrid>{grid}</a:tblGrid>{body}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#
    )
}

fn picture(id: u32, r_id: &str, (x, y, cx, cy): (i64, i64, i64, i64)) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="Picture {id}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{r_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#
    )
}

fn slide(shapes: &str) -> String {
    format!(
        r#"{DECL}<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}

/// Deck with two slides. Slide 1 has a description box, the material table, the
/// equipment picture and a small logo; slide 2 is empty.
pub fn deck_template_bytes() -> Vec<u8> {
    let content_types = format!(
        r#"{DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/><Override PartName="/ppt/slides/slide2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/></Types>"#
    );
    let root_rels = format!(
        r#"{DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL}/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#
    );
    let presentation = format!(
        r#"{DECL}<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/></p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#
    );
    let presentation_rels = format!(
        r#"{DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId2" Type="{REL}/slide" Target="slides/slide1.xml"/><Relationship Id="rId3" Type="{REL}/slide" Target="slides/slide2.xml"/></Relationships>"#
    );
    let description_box = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="TextBox 1"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="2914650" y="495040"/><a:ext cx="2514600" cy="246221"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="square"/><a:lstStyle/><a:p><a:r><a:rPr lang="en-US"/><a:t>OLD DESCRIPTION</a:t></a:r></a:p></p:txBody></p:sp>"#;
    let slide1 = slide(&format!(
        "{description_box}{}{}{}",
        material_table(),
        picture(4, "rId2", PICTURE_BOX),
        picture(5, "rId3", (8000000, 100000, 500000, 300000)),
    ));
    let slide1_rels = format!(
        r#"{DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL}/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="{REL}/image" Target="../media/image1.png"/><Relationship Id="rId3" Type="{REL}/image" Target="../media/image2.png"/></Relationships>"#
    );

    zip_binary(
        &[
            ("[Content_Types].xml", content_types),
            ("_rels/.rels", root_rels),
            ("ppt/presentation.xml", presentation),
            ("ppt/_rels/presentation.xml.rels", presentation_rels),
            ("ppt/slides/slide1.xml", slide1),
            ("ppt/slides/_rels/slide1.xml.rels", slide1_rels),
            ("ppt/slides/slide2.xml", slide("")),
        ],
        &[
            ("ppt/media/image1.png", PICTURE_BYTES),
            ("ppt/media/image2.png", LOGO_BYTES),
        ],
    )
}

/// Write both templates into `dir` and return (workbook, deck) paths.
pub fn write_templates(dir: &Path) -> (PathBuf, PathBuf) {
    let workbook = dir.join("masterfile_template.xlsx");
    let deck = dir.join("deck_template.pptx");
    std::fs::write(&workbook, masterfile_template_bytes()).unwrap();
    std::fs::write(&deck, deck_template_bytes()).unwrap();
    (workbook, deck)
}
