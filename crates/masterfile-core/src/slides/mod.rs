//! Per-equipment slides in the summary deck, refreshed from the output workbook.
//!
//! Each equipment with a slide index gets its description, tag and PMT boxes, its
//! material table and optionally its main picture rewritten from the latest block
//! in the masterfile. Syncing twice gives the same deck.

pub mod block;
pub mod shapes;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::MasterfileError;
use crate::lock::WorkbookLock;
use crate::matching::component::match_component;
use crate::merge::MergeContext;
use crate::model::EquipmentKey;
use crate::ooxml::package::Package;
use crate::ooxml::presentation::{Presentation, Slide};
use crate::parsing::normalize::collapse_ws;
use crate::parsing::values::format_number;
use crate::template::open_sheet;

pub use block::{read_latest_block, BlockRow, EquipmentBlock};
use shapes::{replace_main_picture, tables, upsert_text_box, ShapeBox, Table};

/// How far a text box may sit from its expected spot and still be reused, in EMU.
pub const BOX_TOLERANCE: i64 = 20_000;
pub const DESCRIPTION_BOX: ShapeBox = ShapeBox::new(2_914_650, 495_040, 2_514_600, 246_221);
pub const TAG_BOX: ShapeBox = ShapeBox::new(5_676_900, 496_864, 990_600, 245_110);
pub const PMT_BOX: ShapeBox = ShapeBox::new(7_391_400, 457_200, 1_264_920, 245_110);

/// Table columns written per component row. Column 1 holds the component and is read only.
mod table_columns {
    pub const FLUID: usize = 0;
    pub const COMPONENT: usize = 1;
    pub const TYPE: usize = 3;
    pub const SPEC: usize = 4;
    pub const GRADE: usize = 5;
    pub const INSULATION: usize = 6;
    pub const OPER_TEMP: usize = 7;
    pub const OPER_PRESS: usize = 8;

    pub const WRITTEN: [usize; 7] = [FLUID, TYPE, SPEC, GRADE, INSULATION, OPER_TEMP, OPER_PRESS];
    pub const MIN: usize = 9;
}

const FIRST_COMPONENT_ROW: usize = 2;

/// Slide-friendly material type: `CS` for carbon steel, `SS` for stainless steel.
pub fn short_type(type_name: &str) -> String {
    let upper = type_name.trim().to_uppercase();
    if upper == "CS" || upper == "SS" {
        return upper;
    }
    if upper.contains("CARBON") && upper.contains("STEEL") {
        return "CS".into();
    }
    if upper.contains("STAINLESS") && upper.contains("STEEL") {
        return "SS".into();
    }
    upper
}

/// Insulation cell as a one-letter flag. Anything other than an explicit no counts as insulated.
pub fn insulation_flag(insulation: &str) -> &'static str {
    match insulation.trim().to_uppercase().as_str() {
        "" => "",
        "N" | "NO" => "N",
        _ => "Y",
    }
}

/// What happened to one slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideUpdate {
    pub key: EquipmentKey,
    pub slide_index: usize,
    pub rows: usize,
    pub table_filled: bool,
    pub picture_replaced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlideSkip {
    pub key: EquipmentKey,
    pub slide_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub created_deck: bool,
    pub updated: Vec<SlideUpdate>,
    pub skipped: Vec<SlideSkip>,
}

/// Copy the deck template to `deck_path` unless a deck is already there.
pub fn ensure_deck(template: &Path, deck_path: &Path) -> Result<bool, MasterfileError> {
    if deck_path.exists() {
        return Ok(false);
    }
    if !template.exists() {
        return Err(MasterfileError::MissingTemplateFile(template.to_path_buf()));
    }
    Package::open(template)?.save(deck_path)?;
    info!(path = %deck_path.display(), template = %template.display(), "deck created");
    Ok(true)
}

/// Refresh every mapped slide of the deck from the output workbook.
///
/// `image_map` supplies a new main picture per equipment; missing files are ignored.
pub fn sync_slides(
    ctx: MergeContext<'_>,
    workbook_path: &Path,
    deck_path: &Path,
    image_map: &HashMap<EquipmentKey, PathBuf>,
) -> Result<SyncReport, MasterfileError> {
    let config = ctx.config;
    let _lock = WorkbookLock::acquire(deck_path)?;
    let created_deck = ensure_deck(&config.deck_template_path, deck_path)?;

    let sheet = open_sheet(workbook_path, &config.sheet_name)?;
    let mut deck = Presentation::open(deck_path)?;
    let mut report = SyncReport {
        created_deck,
        ..SyncReport::default()
    };

    for (key, slide_index) in ctx.rules.slide_map() {
        let skip = |reason: String| SlideSkip {
            key: key.clone(),
            slide_index,
            reason,
        };
        let Some(mut slide) = deck.slide(slide_index)? else {
            debug!(key = %key, slide_index, slides = deck.slide_count(), "slide not in deck");
            report.skipped.push(skip(format!(
                "deck has {} slides",
                deck.slide_count()
            )));
            continue;
        };
        let Some(block) = read_latest_block(&sheet, &key, config.first_data_row) else {
            info!(key = %key, "no masterfile rows, slide left as is");
            report.skipped.push(skip("no rows in masterfile".into()));
            continue;
        };

        let update = fill_slide(&mut deck, &mut slide, &key, slide_index, &block, image_map.get(&key))?;
        deck.store_slide(&slide)?;
        if update.picture_replaced {
            deck.prune_image_rels(&slide)?;
        }
        debug!(
            key = %key,
            slide_index,
            rows = update.rows,
            table = update.table_filled,
            picture = update.picture_replaced,
            "slide updated"
        );
        report.updated.push(update);
    }

    deck.save()?;
    info!(
        path = %deck_path.display(),
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        "slides synced"
    );
    Ok(report)
}

fn fill_slide(
    deck: &mut Presentation,
    slide: &mut Slide,
    key: &EquipmentKey,
    slide_index: usize,
    block: &EquipmentBlock,
    image: Option<&PathBuf>,
) -> Result<SlideUpdate, MasterfileError> {
    let embed = match image {
        Some(path) => attach_image(deck, slide, path)?,
        None => None,
    };

    let part = slide.part.clone();
    let tree = slide
        .shape_tree_mut()
        .ok_or_else(|| MasterfileError::xml(&part, "slide has no shape tree"))?;

    upsert_text_box(tree, DESCRIPTION_BOX, BOX_TOLERANCE, &block.description);
    upsert_text_box(tree, TAG_BOX, BOX_TOLERANCE, &key.equipment_no);
    upsert_text_box(tree, PMT_BOX, BOX_TOLERANCE, &key.pmt_no);

    let table_filled = match tables(tree).into_iter().find(is_material_table) {
        Some(mut table) => {
            fill_material_table(&mut table, &block.rows);
            true
        }
        None => {
            debug!(key = %key, "slide has no material table");
            false
        }
    };

    let picture_replaced = match embed {
        Some((r_id, description)) => replace_main_picture(tree, &r_id, &description),
        None => false,
    };

    Ok(SlideUpdate {
        key: key.clone(),
        slide_index,
        rows: block.rows.len(),
        table_filled,
        picture_replaced,
    })
}

/// Store the image for the slide. `None` when the file is missing or the slide has no
/// picture to replace.
fn attach_image(
    deck: &mut Presentation,
    slide: &Slide,
    path: &Path,
) -> Result<Option<(String, String)>, MasterfileError> {
    if !path.is_file() {
        warn!(image = %path.display(), "slide image not found, picture kept");
        return Ok(None);
    }
    let has_picture = slide
        .shape_tree()
        .is_some_and(|tree| !shapes::pictures(tree).is_empty());
    if !has_picture {
        debug!(slide = %slide.part, "no picture to replace");
        return Ok(None);
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png");
    let bytes = std::fs::read(path)?;
    let r_id = deck.add_image(&slide.part, extension, bytes)?;
    let description = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Some((r_id, description)))
}

/// Header row with FLUID and COMPONENT, a TYPE sub-header and at least nine columns.
fn is_material_table(table: &Table<'_>) -> bool {
    let header = |row, col| collapse_ws(&table.cell_text(row, col)).to_uppercase();
    table.row_count() >= 3
        && table.column_count() >= table_columns::MIN
        && header(0, 0).contains("FLUID")
        && header(0, 1).contains("COMPONENT")
        && header(1, 3).contains("TYPE")
}

fn fill_material_table(table: &mut Table<'_>, rows: &[BlockRow]) {
    use table_columns::*;

    for r in FIRST_COMPONENT_ROW..table.row_count() {
        let component = table.cell_text(r, COMPONENT);
        match match_component(&component, rows, |row| row.part.as_str()) {
            Some(row) => {
                let values = [
                    (FLUID, row.fluid.clone()),
                    (TYPE, short_type(&row.type_name)),
                    (SPEC, row.spec.clone()),
                    (GRADE, row.grade.clone()),
                    (INSULATION, insulation_flag(&row.insulation).to_string()),
                    (OPER_TEMP, format_number(row.oper_temp)),
                    (OPER_PRESS, format_number(row.oper_press)),
                ];
                for (col, text) in values {
                    table.set_cell_text(r, col, &text);
                }
            }
            None => {
                for col in WRITTEN {
                    table.set_cell_text(r, col, "");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MasterfileConfig;
    use crate::ooxml::fixtures;
    use crate::rules::builtin_store;
    use shapes::{shape_box, text_of};

    struct Setup {
        dir: tempfile::TempDir,
        config: MasterfileConfig,
        workbook: PathBuf,
        deck: PathBuf,
    }

    /// Output workbook holding the reference blocks as if they had been appended.
    fn setup() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let (template, deck_template) = fixtures::write_templates(dir.path());
        let workbook = dir.path().join("masterfile.xlsx");
        std::fs::write(&workbook, fixtures::masterfile_template_bytes()).unwrap();
        let config = MasterfileConfig {
            template_path: template,
            deck_template_path: deck_template,
            ..MasterfileConfig::default()
        };
        let deck = dir.path().join("out").join("deck.pptx");
        Setup {
            dir,
            config,
            workbook,
            deck,
        }
    }

    fn sync(s: &Setup, images: &HashMap<EquipmentKey, PathBuf>) -> SyncReport {
        let ctx = MergeContext {
            config: &s.config,
            rules: builtin_store(),
        };
        sync_slides(ctx, &s.workbook, &s.deck, images).unwrap()
    }

    fn table_rows(slide: &mut Slide) -> Vec<Vec<String>> {
        let tree = slide.shape_tree_mut().unwrap();
        let tables = tables(tree);
        let table = tables.into_iter().find(is_material_table).unwrap();
        (0..table.row_count())
            .map(|r| (0..9).map(|c| table.cell_text(r, c)).collect())
            .collect()
    }

    fn box_text(slide: &Slide, target: ShapeBox) -> Option<String> {
        slide
            .shape_tree()
            .unwrap()
            .children_named("sp")
            .find(|sp| shape_box(sp).is_some_and(|b| b.near(&target, BOX_TOLERANCE)))
            .map(text_of)
    }

    #[test]
    fn test_short_type_and_flag() {
        assert_eq!(short_type("Carbon Steel"), "CS");
        assert_eq!(short_type(" ss "), "SS");
        assert_eq!(short_type("STAINLESS STEEL 316"), "SS");
        assert_eq!(short_type("Duplex"), "DUPLEX");
        assert_eq!(insulation_flag("YES"), "Y");
        assert_eq!(insulation_flag("no"), "N");
        assert_eq!(insulation_flag(""), "");
        assert_eq!(insulation_flag("PP"), "Y");
    }

    #[test]
    fn test_sync_fills_first_slide() {
        let s = setup();
        let report = sync(&s, &HashMap::new());

        assert!(report.created_deck);
        assert_eq!(report.updated.len(), 2);
        assert!(report.updated[0].table_filled);
        assert!(!report.updated[1].table_filled);
        // Keys mapped past slide 2 have no slide in this deck.
        assert!(report.skipped.iter().all(|s| s.slide_index >= 2));

        let deck = Presentation::open(&s.deck).unwrap();
        let mut slide = deck.slide(0).unwrap().unwrap();
        assert_eq!(box_text(&slide, DESCRIPTION_BOX).as_deref(), Some("AIR RECEIVER"));
        assert_eq!(box_text(&slide, TAG_BOX).as_deref(), Some("V-001"));
        assert_eq!(box_text(&slide, PMT_BOX).as_deref(), Some("MLK PMT 10101"));

        let rows = table_rows(&mut slide);
        assert_eq!(rows[2], ["AIR", "SHELL", "", "CS", "SA", "516-70", "N", "40", "0.8"]);
        assert_eq!(rows[3], ["AIR", "TOP HEAD", "", "CS", "SA", "516-70", "N", "40", "0.8"]);
        assert_eq!(rows[4], ["", "NOZZLE", "", "", "", "", "", "", ""]);
        assert_eq!(rows[1][3], "TYPE");

        let second = deck.slide(1).unwrap().unwrap();
        assert_eq!(box_text(&second, DESCRIPTION_BOX).as_deref(), Some("KNOCK OUT DRUM"));
        assert_eq!(box_text(&second, TAG_BOX).as_deref(), Some("V-002"));
    }

    #[test]
    fn test_sync_twice_is_stable() {
        let s = setup();
        let image = s.dir.path().join("sketch.png");
        std::fs::write(&image, b"\x89PNG\r\n\x1a\n new sketch").unwrap();
        let images = HashMap::from([(EquipmentKey::new("MLK PMT 10101", "V-001"), image)]);

        let first = sync(&s, &images);
        let after_first = Presentation::open(&s.deck).unwrap().slide(0).unwrap().unwrap();
        let second = sync(&s, &images);
        let after_second = Presentation::open(&s.deck).unwrap().slide(0).unwrap().unwrap();

        assert!(!second.created_deck);
        assert_eq!(first.updated, second.updated);
        let shapes = |slide: &Slide| slide.shape_tree().unwrap().elements().count();
        assert_eq!(shapes(&after_first), shapes(&after_second));
        assert_eq!(
            box_text(&after_first, TAG_BOX),
            box_text(&after_second, TAG_BOX)
        );
    }

    #[test]
    fn test_picture_replaced_at_main_geometry() {
        let s = setup();
        let image = s.dir.path().join("sketch.png");
        std::fs::write(&image, b"\x89PNG\r\n\x1a\n new sketch").unwrap();
        let images = HashMap::from([(EquipmentKey::new("mlk pmt 10101", "v-001"), image)]);

        let report = sync(&s, &images);
        assert!(report.updated[0].picture_replaced);

        let deck = Presentation::open(&s.deck).unwrap();
        let slide = deck.slide(0).unwrap().unwrap();
        let tree = slide.shape_tree().unwrap();
        let pictures: Vec<_> = tree.children_named("pic").collect();
        // Logo kept, main picture swapped.
        assert_eq!(pictures.len(), 2);
        let (x, y, cx, cy) = fixtures::PICTURE_BOX;
        assert_eq!(shape_box(pictures[1]), Some(ShapeBox::new(x, y, cx, cy)));
        assert_eq!(pictures[0].find("blip").unwrap().attr("r:embed"), Some("rId3"));
    }

    #[test]
    fn test_missing_image_keeps_picture() {
        let s = setup();
        let images = HashMap::from([(
            EquipmentKey::new("MLK PMT 10101", "V-001"),
            s.dir.path().join("absent.png"),
        )]);
        let report = sync(&s, &images);
        assert!(!report.updated[0].picture_replaced);
    }

    #[test]
    fn test_missing_deck_template() {
        let s = setup();
        let config = MasterfileConfig {
            deck_template_path: s.dir.path().join("gone.pptx"),
            ..s.config.clone()
        };
        let ctx = MergeContext {
            config: &config,
            rules: builtin_store(),
        };
        let result = sync_slides(ctx, &s.workbook, &s.deck, &HashMap::new());
        assert!(matches!(result, Err(MasterfileError::MissingTemplateFile(_))));
    }

    #[test]
    fn test_keys_without_rows_are_skipped() {
        let s = setup();
        std::fs::write(&s.workbook, fixtures::workbook_bytes(&fixtures::TEMPLATE_ROWS[2..4])).unwrap();
        let report = sync(&s, &HashMap::new());
        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.updated[0].key, EquipmentKey::new("MLK PMT 10102", "V-002"));
        assert!(report
            .skipped
            .iter()
            .any(|s| s.slide_index == 0 && s.reason.contains("no rows")));
    }
}
