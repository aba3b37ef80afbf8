use std::path::{Path, PathBuf};

use crate::error::MasterfileError;
use crate::ooxml::dom::{local_name, Document, Node};
use crate::ooxml::package::{rels_path_for, Package, CONTENT_TYPES};
use crate::ooxml::sheet::{rich_text, Worksheet};
use crate::ooxml::styles::{Alignment, Stylesheet};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";
const STYLES_PART: &str = "xl/styles.xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// An xlsx package opened for editing one worksheet.
#[derive(Debug, Clone)]
pub struct XlsxWorkbook {
    path: PathBuf,
    package: Package,
    sheet: Worksheet,
    styles: Option<Stylesheet>,
}

impl XlsxWorkbook {
    pub fn open(path: &Path, sheet_name: &str) -> Result<Self, MasterfileError> {
        let package = Package::open(path)?;
        let sheet_part = find_sheet_part(&package, sheet_name)?.ok_or_else(|| {
            MasterfileError::SheetNotFound {
                sheet: sheet_name.to_string(),
                path: path.to_path_buf(),
            }
        })?;

        let shared_strings = if package.has_part(SHARED_STRINGS_PART) {
            package
                .xml(SHARED_STRINGS_PART)?
                .root
                .children_named("si")
                .map(rich_text)
                .collect()
        } else {
            Vec::new()
        };

        let sheet = Worksheet::from_document(package.xml(&sheet_part)?, &shared_strings, &sheet_part)?;
        let styles = if package.has_part(STYLES_PART) {
            Some(Stylesheet::new(package.xml(STYLES_PART)?))
        } else {
            None
        };

        Ok(XlsxWorkbook {
            path: path.to_path_buf(),
            package,
            sheet,
            styles,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet(&self) -> &Worksheet {
        &self.sheet
    }

    pub fn sheet_mut(&mut self) -> &mut Worksheet {
        &mut self.sheet
    }

    /// Style index equal to `base` but with `alignment`. Without a stylesheet the base is kept.
    pub fn aligned_style(
        &mut self,
        base: Option<u32>,
        alignment: Alignment,
    ) -> Result<Option<u32>, MasterfileError> {
        match self.styles.as_mut() {
            Some(styles) => styles.aligned(base, alignment).map(Some),
            None => Ok(base),
        }
    }

    /// Remove the calculation chain so Excel rebuilds it after cells were cleared.
    pub fn drop_calc_chain(&mut self) -> Result<(), MasterfileError> {
        if !self.package.has_part(CALC_CHAIN_PART) {
            return Ok(());
        }

        self.package.remove_part(CALC_CHAIN_PART);

        let mut types = self.package.xml(CONTENT_TYPES)?;
        types.root.children.retain(|n| {
            !matches!(n, Node::Element(e)
                if e.is("Override") && e.attr("PartName") == Some("/xl/calcChain.xml"))
        });
        self.package.set_xml(CONTENT_TYPES, &types)?;

        let rels_part = rels_path_for(WORKBOOK_PART);
        if self.package.has_part(&rels_part) {
            let mut rels = self.package.xml(&rels_part)?;
            rels.root.children.retain(|n| {
                !matches!(n, Node::Element(e)
                    if e.attr("Target").is_some_and(|t| t.ends_with("calcChain.xml")))
            });
            self.package.set_xml(&rels_part, &rels)?;
        }
        Ok(())
    }

    /// Write the worksheet (and styles, if changed) back and persist atomically.
    pub fn save(&mut self) -> Result<(), MasterfileError> {
        let sheet_part = self.sheet.part().to_string();
        self.package.set_xml(&sheet_part, &self.sheet.to_document())?;
        if let Some(styles) = self.styles.as_ref().filter(|s| s.is_dirty()) {
            self.package.set_xml(STYLES_PART, styles.document())?;
        }
        self.package.save(&self.path)
    }

    /// Save under a new path, which becomes this workbook's path.
    pub fn save_as(&mut self, path: &Path) -> Result<(), MasterfileError> {
        self.path = path.to_path_buf();
        self.save()
    }
}

/// Part name of the worksheet called `sheet_name`, via `workbook.xml` and its rels.
fn find_sheet_part(package: &Package, sheet_name: &str) -> Result<Option<String>, MasterfileError> {
    let workbook: Document = package.xml(WORKBOOK_PART)?;
    let Some(sheets) = workbook.root.child("sheets") else {
        return Ok(None);
    };
    let Some(r_id) = sheets
        .children_named("sheet")
        .find(|s| s.attr("name") == Some(sheet_name))
        .and_then(|s| {
            s.attrs
                .iter()
                .find(|(k, _)| k.contains(':') && local_name(k) == "id")
                .map(|(_, v)| v.as_str())
        })
    else {
        return Ok(None);
    };
    package.rel_target(WORKBOOK_PART, r_id)
}
