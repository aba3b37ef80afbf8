use serde::{Deserialize, Serialize};

use crate::error::MasterfileError;
use crate::ooxml::dom::{prefix_of, Document, Element, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Horizontal {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Top,
    Center,
    Bottom,
}

/// Cell alignment as written to `xf/alignment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Alignment {
    pub horizontal: Horizontal,
    pub vertical: Vertical,
    pub wrap_text: bool,
}

impl Alignment {
    /// Left and vertically centred, no wrapping (merged description cells).
    pub const DESCRIPTION: Alignment = Alignment {
        horizontal: Horizontal::Left,
        vertical: Vertical::Center,
        wrap_text: false,
    };

    fn apply(&self, xf: &mut Element, prefix: &str) {
        let alignment = xf.ensure_child("alignment", &format!("{prefix}alignment"));
        alignment.set_attr(
            "horizontal",
            match self.horizontal {
                Horizontal::Left => "left",
                Horizontal::Center => "center",
                Horizontal::Right => "right",
            },
        );
        alignment.set_attr(
            "vertical",
            match self.vertical {
                Vertical::Top => "top",
                Vertical::Center => "center",
                Vertical::Bottom => "bottom",
            },
        );
        alignment.set_attr("wrapText", if self.wrap_text { "1" } else { "0" });
        xf.set_attr("applyAlignment", "1");
    }
}

/// The `cellXfs` table of `xl/styles.xml`.
#[derive(Debug, Clone)]
pub struct Stylesheet {
    doc: Document,
    dirty: bool,
}

impl Stylesheet {
    pub fn new(doc: Document) -> Self {
        Stylesheet { doc, dirty: false }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    fn cell_xfs(&self) -> Option<&Element> {
        self.doc.root.child("cellXfs")
    }

    pub fn xf_count(&self) -> usize {
        self.cell_xfs()
            .map_or(0, |xfs| xfs.children_named("xf").count())
    }

    /// Index of a format equal to `base` but with `alignment`, added when missing.
    pub fn aligned(&mut self, base: Option<u32>, alignment: Alignment) -> Result<u32, MasterfileError> {
        let prefix = prefix_of(&self.doc.root.name).to_string();
        let xfs = self
            .cell_xfs()
            .ok_or_else(|| MasterfileError::xml("xl/styles.xml", "no cellXfs table"))?;

        let base_xf = xfs
            .children_named("xf")
            .nth(base.unwrap_or(0) as usize)
            .cloned()
            .unwrap_or_else(|| Element::new(format!("{prefix}xf")));
        let mut wanted = base_xf;
        alignment.apply(&mut wanted, &prefix);

        if let Some(existing) = xfs.children_named("xf").position(|xf| *xf == wanted) {
            return Ok(existing as u32);
        }

        let xfs = self
            .doc
            .root
            .child_mut("cellXfs")
            .ok_or_else(|| MasterfileError::xml("xl/styles.xml", "no cellXfs table"))?;
        xfs.children.push(Node::Element(wanted));
        let count = xfs.children_named("xf").count();
        xfs.set_attr("count", count.to_string());
        self.dirty = true;
        Ok((count - 1) as u32)
    }
}
