use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::MasterfileError;
use crate::ooxml::dom::{local_name, Document, Element, Node};
use crate::ooxml::package::{rels_path_for, Package, REL_TYPE_IMAGE};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const MEDIA_DIR: &str = "ppt/media";

/// One slide part, parsed.
#[derive(Debug, Clone)]
pub struct Slide {
    pub part: String,
    pub doc: Document,
}

impl Slide {
    /// The `p:spTree` holding the slide's shapes.
    pub fn shape_tree(&self) -> Option<&Element> {
        self.doc.root.child("cSld")?.child("spTree")
    }

    pub fn shape_tree_mut(&mut self) -> Option<&mut Element> {
        self.doc.root.child_mut("cSld")?.child_mut("spTree")
    }
}

/// A pptx package with its slides listed in presentation order.
#[derive(Debug, Clone)]
pub struct Presentation {
    path: PathBuf,
    package: Package,
    slide_parts: Vec<String>,
}

impl Presentation {
    pub fn open(path: &Path) -> Result<Self, MasterfileError> {
        let package = Package::open(path)?;
        let presentation = package.xml(PRESENTATION_PART)?;

        let mut slide_parts = Vec::new();
        if let Some(list) = presentation.root.child("sldIdLst") {
            for sld_id in list.children_named("sldId") {
                let Some(r_id) = relationship_id(sld_id) else {
                    continue;
                };
                let part = package.rel_target(PRESENTATION_PART, r_id)?.ok_or_else(|| {
                    MasterfileError::xml(PRESENTATION_PART, format!("dangling slide relationship {r_id}"))
                })?;
                slide_parts.push(part);
            }
        }

        Ok(Presentation {
            path: path.to_path_buf(),
            package,
            slide_parts,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn slide_count(&self) -> usize {
        self.slide_parts.len()
    }

    /// Slide at a 0-based position, `None` past the end.
    pub fn slide(&self, index: usize) -> Result<Option<Slide>, MasterfileError> {
        let Some(part) = self.slide_parts.get(index) else {
            return Ok(None);
        };
        Ok(Some(Slide {
            part: part.clone(),
            doc: self.package.xml(part)?,
        }))
    }

    pub fn store_slide(&mut self, slide: &Slide) -> Result<(), MasterfileError> {
        self.package.set_xml(&slide.part, &slide.doc)
    }

    /// Add an image for `slide_part` and return the relationship id to embed it with.
    ///
    /// Identical bytes already in the media folder are reused instead of stored twice.
    pub fn add_image(
        &mut self,
        slide_part: &str,
        extension: &str,
        bytes: Vec<u8>,
    ) -> Result<String, MasterfileError> {
        let extension = extension.to_ascii_lowercase();
        let content_type = image_content_type(&extension)
            .ok_or_else(|| MasterfileError::Package(format!("unsupported image type '.{extension}'")))?;

        let existing = self
            .package
            .part_names()
            .filter(|name| name.starts_with(MEDIA_DIR))
            .find(|name| self.package.part(name) == Some(bytes.as_slice()))
            .map(str::to_string);
        let media_part = match existing {
            Some(name) => name,
            None => {
                let name = self.next_media_name(&extension);
                self.package.set_part(&name, bytes);
                self.package.ensure_default_content_type(&extension, content_type)?;
                name
            }
        };
        debug!(slide = slide_part, media = %media_part, "image attached");
        self.package.add_rel(slide_part, REL_TYPE_IMAGE, &media_part)
    }

    /// Drop relationships of `slide_part` whose ids are no longer referenced by the slide.
    pub fn prune_image_rels(&mut self, slide: &Slide) -> Result<(), MasterfileError> {
        let rels_part = rels_path_for(&slide.part);
        if !self.package.has_part(&rels_part) {
            return Ok(());
        }
        let mut used = Vec::new();
        collect_rel_refs(&slide.doc.root, &mut used);

        let mut rels = self.package.xml(&rels_part)?;
        let before = rels.root.children.len();
        rels.root.children.retain(|n| match n {
            Node::Element(r) if r.attr("Type") == Some(REL_TYPE_IMAGE) => {
                r.attr("Id").is_some_and(|id| used.iter().any(|u| u == id))
            }
            _ => true,
        });
        if rels.root.children.len() != before {
            self.package.set_xml(&rels_part, &rels)?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<(), MasterfileError> {
        self.package.save(&self.path)
    }

    fn next_media_name(&self, extension: &str) -> String {
        let next = self
            .package
            .part_names()
            .filter_map(|name| name.strip_prefix("ppt/media/image"))
            .filter_map(|rest| rest.split('.').next()?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        format!("{MEDIA_DIR}/image{next}.{extension}")
    }
}

pub fn image_content_type(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// Value of a namespaced `*:id` attribute (`r:id`), whatever the prefix.
pub fn relationship_id(el: &Element) -> Option<&str> {
    el.attrs
        .iter()
        .find(|(k, _)| k.contains(':') && local_name(k) == "id")
        .map(|(_, v)| v.as_str())
}

fn collect_rel_refs(el: &Element, out: &mut Vec<String>) {
    for (k, v) in &el.attrs {
        if k.contains(':') && matches!(local_name(k), "embed" | "link" | "id") {
            out.push(v.clone());
        }
    }
    for child in el.elements() {
        collect_rel_refs(child, out);
    }
}
