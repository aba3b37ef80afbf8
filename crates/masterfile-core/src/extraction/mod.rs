pub mod prompts;
pub mod replay;
pub mod response;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::error::MasterfileError;
use crate::model::{BomItem, DesignMetadata, EquipmentKey};
use crate::rules::TemplateRuleStore;

/// What a selected region of a drawing page contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStep {
    DesignData,
    Bom,
    SlideImage,
}

/// A rectangle on a page image in fractions of the page size (0.0 - 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionSelection {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// A pixel rectangle, right/lower exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: u32,
    pub upper: u32,
    pub right: u32,
    pub lower: u32,
}

impl PixelRect {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.lower - self.upper
    }
}

impl RegionSelection {
    /// Scale to a page of `width` x `height` pixels, clamping to the page.
    ///
    /// A rectangle that ends up with zero width or height is an `InvalidRegion`.
    pub fn resolve(&self, width: u32, height: u32) -> Result<PixelRect, MasterfileError> {
        let scale = |fraction: f64, size: u32| -> u32 {
            let px = (fraction * f64::from(size)).trunc();
            px.clamp(0.0, f64::from(size)) as u32
        };

        let rect = PixelRect {
            left: scale(self.x1, width),
            upper: scale(self.y1, height),
            right: scale(self.x2, width),
            lower: scale(self.y2, height),
        };

        if rect.right <= rect.left || rect.lower <= rect.upper {
            return Err(MasterfileError::InvalidRegion(format!(
                "({}, {}) - ({}, {}) on a {width}x{height} page has no area",
                self.x1, self.y1, self.x2, self.y2
            )));
        }
        Ok(rect)
    }
}

/// A resolved crop handed to the extraction oracle. Pixel work happens on the oracle side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionImage {
    /// Drawing the region belongs to.
    pub drawing: String,
    /// Stable name of the region within its drawing, e.g. `design` or `bom-2`.
    pub label: String,
    pub page_image: PathBuf,
    pub rect: PixelRect,
}

/// A vision-capable service that reads a table image and answers with (ideally) JSON text.
pub trait ExtractionOracle: Send + Sync {
    /// Run `instruction` against the region and return the raw answer text.
    fn extract(&self, region: &RegionImage, instruction: &str) -> Result<String, MasterfileError>;

    /// Name of this oracle backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Ask the oracle for the design-data block of one drawing.
///
/// Unparseable answers become an all-null block. Side completion and the rule's
/// `force_null_operating` are applied before returning.
pub fn extract_design_metadata(
    oracle: &dyn ExtractionOracle,
    region: &RegionImage,
    key: &EquipmentKey,
    rules: &TemplateRuleStore,
) -> Result<DesignMetadata, MasterfileError> {
    let rule = rules.get_design_rule(key);
    let instruction = prompts::design_instruction(rule);
    let text = oracle.extract(region, &instruction)?;
    let meta = response::parse_design_metadata(&text);
    let meta = meta.normalized(rule.is_some_and(|r| r.force_null_operating));
    debug!(
        backend = oracle.backend_name(),
        %key,
        ?meta,
        "design metadata extracted"
    );
    Ok(meta)
}

/// Ask the oracle for the BOM items in one region.
pub fn extract_bom_items(
    oracle: &dyn ExtractionOracle,
    region: &RegionImage,
    key: &EquipmentKey,
    rules: &TemplateRuleStore,
) -> Result<Vec<BomItem>, MasterfileError> {
    let instruction = prompts::bom_instruction(rules.get_bom_rule(key));
    let text = oracle.extract(region, &instruction)?;
    let items = response::parse_bom_items(&text);
    debug!(
        backend = oracle.backend_name(),
        %key,
        region = %region.label,
        count = items.len(),
        "bom items extracted"
    );
    Ok(items)
}
