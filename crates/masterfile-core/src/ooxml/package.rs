use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::MasterfileError;
use crate::ooxml::dom::{Document, Element, Node};

pub const CONTENT_TYPES: &str = "[Content_Types].xml";
pub const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const REL_TYPE_IMAGE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

/// An Office Open XML package held in memory, parts kept in archive order.
#[derive(Debug, Clone)]
pub struct Package {
    parts: Vec<(String, Vec<u8>)>,
}

impl Package {
    pub fn open(path: &Path) -> Result<Self, MasterfileError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes).map_err(|e| MasterfileError::Workbook {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MasterfileError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| MasterfileError::Package(format!("not a zip package: {e}")))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| MasterfileError::Package(e.to_string()))?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            parts.push((name, content));
        }

        if !parts.iter().any(|(name, _)| name == CONTENT_TYPES) {
            return Err(MasterfileError::Package(format!("missing {CONTENT_TYPES}")));
        }
        Ok(Package { parts })
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_part(&self, name: &str) -> bool {
        self.part(name).is_some()
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = bytes,
            None => self.parts.push((name.to_string(), bytes)),
        }
    }

    pub fn remove_part(&mut self, name: &str) {
        self.parts.retain(|(n, _)| n != name);
    }

    pub fn xml(&self, name: &str) -> Result<Document, MasterfileError> {
        let bytes = self
            .part(name)
            .ok_or_else(|| MasterfileError::Package(format!("missing part {name}")))?;
        let text = std::str::from_utf8(bytes).map_err(|e| MasterfileError::xml(name, e))?;
        Document::parse(text, name)
    }

    pub fn set_xml(&mut self, name: &str, doc: &Document) -> Result<(), MasterfileError> {
        let bytes = doc.to_bytes(name)?;
        self.set_part(name, bytes);
        Ok(())
    }

    /// Relationships of a part, or an empty relationship set when the part has none.
    pub fn rels(&self, part: &str) -> Result<Document, MasterfileError> {
        let name = rels_path_for(part);
        if self.has_part(&name) {
            self.xml(&name)
        } else {
            Ok(Document {
                root: Element::new("Relationships").with_attr("xmlns", REL_NS),
            })
        }
    }

    /// Resolve relationship `r_id` of `part` to a part name.
    pub fn rel_target(&self, part: &str, r_id: &str) -> Result<Option<String>, MasterfileError> {
        let rels = self.rels(part)?;
        let target = rels
            .root
            .children_named("Relationship")
            .find(|r| r.attr("Id") == Some(r_id))
            .and_then(|r| r.attr("Target"))
            .map(|target| resolve_target(part, target));
        Ok(target)
    }

    /// Add a relationship from `part` to `target_part` and return its id.
    pub fn add_rel(
        &mut self,
        part: &str,
        rel_type: &str,
        target_part: &str,
    ) -> Result<String, MasterfileError> {
        let mut rels = self.rels(part)?;
        let next = rels
            .root
            .children_named("Relationship")
            .filter_map(|r| r.attr("Id")?.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let id = format!("rId{next}");
        rels.root.children.push(Node::Element(
            Element::new("Relationship")
                .with_attr("Id", id.as_str())
                .with_attr("Type", rel_type)
                .with_attr("Target", relative_target(part, target_part)),
        ));
        self.set_xml(&rels_path_for(part), &rels)?;
        Ok(id)
    }

    /// Register a default content type for a file extension unless one exists.
    pub fn ensure_default_content_type(
        &mut self,
        extension: &str,
        content_type: &str,
    ) -> Result<(), MasterfileError> {
        let mut types = self.xml(CONTENT_TYPES)?;
        let exists = types
            .root
            .children_named("Default")
            .any(|d| d.attr("Extension").is_some_and(|e| e.eq_ignore_ascii_case(extension)));
        if exists {
            return Ok(());
        }
        types.root.children.insert(
            0,
            Node::Element(
                Element::new("Default")
                    .with_attr("Extension", extension)
                    .with_attr("ContentType", content_type),
            ),
        );
        self.set_xml(CONTENT_TYPES, &types)
    }

    /// Zip the package into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MasterfileError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // [Content_Types].xml first, as Office writes it.
        let ordered = self
            .parts
            .iter()
            .filter(|(n, _)| n == CONTENT_TYPES)
            .chain(self.parts.iter().filter(|(n, _)| n != CONTENT_TYPES));
        for (name, bytes) in ordered {
            zip.start_file(name.as_str(), options)
                .map_err(|e| MasterfileError::Package(e.to_string()))?;
            zip.write_all(bytes)?;
        }

        let cursor = zip
            .finish()
            .map_err(|e| MasterfileError::Package(e.to_string()))?;
        Ok(cursor.into_inner())
    }

    /// Write the package next to `path` and move it into place.
    pub fn save(&self, path: &Path) -> Result<(), MasterfileError> {
        let bytes = self.to_bytes()?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| MasterfileError::Io(e.error))?;
        debug!(path = %path.display(), bytes = bytes.len(), "package saved");
        Ok(())
    }
}

/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`.
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship target against the directory of its source part.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = source_part.split('/').collect();
    segments.pop();
    for segment in target.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// Inverse of [`resolve_target`] for targets below the source's parent directory.
fn relative_target(source_part: &str, target_part: &str) -> String {
    let source_dir: Vec<&str> = {
        let mut s: Vec<&str> = source_part.split('/').collect();
        s.pop();
        s
    };
    let target: Vec<&str> = target_part.split('/').collect();
    let common = source_dir
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut out: Vec<&str> = vec![".."; source_dir.len() - common];
    out.extend(&target[common..]);
    out.join("/")
}
