//! Drawing-to-deck orchestration: oracle extraction, masterfile append and slide sync.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::MasterfileError;
use crate::extraction::{
    extract_bom_items, extract_design_metadata, ExtractionOracle, RegionImage, RegionSelection,
    RegionStep,
};
use crate::merge::{append_equipment, AppendOutcome, MergeContext};
use crate::model::{BomItem, DesignMetadata, EquipmentKey};
use crate::parsing::parse_filename;
use crate::slides::{sync_slides, SyncReport};
use crate::template::require_template;

/// One selected region of a rendered drawing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionJob {
    pub step: RegionStep,
    /// Page image the selection refers to. For a slide image this is the picture placed on
    /// the slide.
    pub page_image: PathBuf,
    pub page_width: u32,
    pub page_height: u32,
    pub selection: RegionSelection,
}

/// A drawing and the regions selected on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingJob {
    /// Drawing file name, `<PMT NO> - <EQUIPMENT NO>.pdf`.
    pub drawing: String,
    #[serde(default)]
    pub regions: Vec<RegionJob>,
}

impl DrawingJob {
    pub fn key(&self) -> EquipmentKey {
        parse_filename(&self.drawing)
    }
}

/// Output files shared by every drawing of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub workbook: PathBuf,
    pub deck: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionFailure {
    pub label: String,
    pub error: String,
}

/// What the oracle produced for one drawing.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub design: DesignMetadata,
    pub bom_items: Vec<BomItem>,
    pub slide_image: Option<PathBuf>,
    pub failed_regions: Vec<RegionFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawingReport {
    pub drawing: String,
    pub append: AppendOutcome,
    pub bom_items: usize,
    pub failed_regions: Vec<RegionFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawingFailure {
    pub drawing: String,
    pub error: String,
}

/// Outcome of a batch: per-drawing results, isolated failures and the final sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub drawings: Vec<DrawingReport>,
    pub failures: Vec<DrawingFailure>,
    pub sync: Option<SyncReport>,
    pub sync_error: Option<String>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
            && self.sync_error.is_none()
            && self.drawings.iter().all(|d| d.failed_regions.is_empty())
    }
}

fn region_image(job: &DrawingJob, region: &RegionJob, label: String) -> Result<RegionImage, MasterfileError> {
    Ok(RegionImage {
        drawing: job.drawing.clone(),
        label,
        page_image: region.page_image.clone(),
        rect: region.selection.resolve(region.page_width, region.page_height)?,
    })
}

/// Run the oracle over a drawing's regions.
///
/// Only the first design region is read. Every BOM region is read and the items are
/// concatenated in region order. A region that fails is recorded and left out; the
/// design block then stays all null.
pub fn extract_drawing(
    oracle: &dyn ExtractionOracle,
    job: &DrawingJob,
    ctx: MergeContext<'_>,
) -> Extraction {
    let key = job.key();
    let mut out = Extraction::default();
    let fail = |label: &str, e: MasterfileError, out: &mut Extraction| {
        warn!(drawing = %job.drawing, region = label, error = %e, "region skipped");
        out.failed_regions.push(RegionFailure {
            label: label.to_string(),
            error: e.to_string(),
        });
    };

    if let Some(region) = job.regions.iter().find(|r| r.step == RegionStep::DesignData) {
        let result = region_image(job, region, "design".into())
            .and_then(|image| extract_design_metadata(oracle, &image, &key, ctx.rules));
        match result {
            Ok(design) => out.design = design,
            Err(e) => fail("design", e, &mut out),
        }
    }

    let bom_regions = job.regions.iter().filter(|r| r.step == RegionStep::Bom);
    for (i, region) in bom_regions.enumerate() {
        let label = format!("bom-{}", i + 1);
        let result = region_image(job, region, label.clone())
            .and_then(|image| extract_bom_items(oracle, &image, &key, ctx.rules));
        match result {
            Ok(items) => out.bom_items.extend(items),
            Err(e) => fail(&label, e, &mut out),
        }
    }

    if let Some(region) = job.regions.iter().find(|r| r.step == RegionStep::SlideImage) {
        match region.selection.resolve(region.page_width, region.page_height) {
            Ok(_) => out.slide_image = Some(region.page_image.clone()),
            Err(e) => fail("slide", e, &mut out),
        }
    }
    out
}

fn extract_and_append(
    ctx: MergeContext<'_>,
    oracle: &dyn ExtractionOracle,
    job: &DrawingJob,
    workbook: &Path,
) -> Result<(DrawingReport, Option<PathBuf>), MasterfileError> {
    require_template(&ctx.config.template_path)?;
    let extraction = extract_drawing(oracle, job, ctx);
    let append = append_equipment(
        ctx,
        workbook,
        &job.drawing,
        &extraction.design,
        &extraction.bom_items,
    )?;
    let report = DrawingReport {
        drawing: job.drawing.clone(),
        append,
        bom_items: extraction.bom_items.len(),
        failed_regions: extraction.failed_regions,
    };
    Ok((report, extraction.slide_image))
}

/// Extract one drawing, append it to the masterfile and refresh the deck.
pub fn process_drawing(
    ctx: MergeContext<'_>,
    oracle: &dyn ExtractionOracle,
    job: &DrawingJob,
    paths: &OutputPaths,
) -> Result<(DrawingReport, SyncReport), MasterfileError> {
    let (report, slide_image) = extract_and_append(ctx, oracle, job, &paths.workbook)?;
    let image_map: HashMap<EquipmentKey, PathBuf> = slide_image
        .map(|image| (job.key(), image))
        .into_iter()
        .collect();
    let sync = sync_slides(ctx, &paths.workbook, &paths.deck, &image_map)?;
    Ok((report, sync))
}

/// Process drawings in order, then sync the deck once.
///
/// A missing reference template aborts the batch before any extraction. Otherwise a
/// drawing that fails is reported and the batch moves on. The sync runs only when at
/// least one block was appended.
pub fn process_batch(
    ctx: MergeContext<'_>,
    oracle: &dyn ExtractionOracle,
    jobs: &[DrawingJob],
    paths: &OutputPaths,
) -> Result<BatchReport, MasterfileError> {
    require_template(&ctx.config.template_path)?;
    let mut report = BatchReport::default();
    let mut image_map = HashMap::new();

    for job in jobs {
        match extract_and_append(ctx, oracle, job, &paths.workbook) {
            Ok((drawing, slide_image)) => {
                if let Some(image) = slide_image {
                    image_map.insert(job.key(), image);
                }
                report.drawings.push(drawing);
            }
            Err(e) => {
                warn!(drawing = %job.drawing, error = %e, "drawing failed");
                report.failures.push(DrawingFailure {
                    drawing: job.drawing.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    let appended = report
        .drawings
        .iter()
        .any(|d| matches!(d.append, AppendOutcome::Appended { .. }));
    if appended {
        match sync_slides(ctx, &paths.workbook, &paths.deck, &image_map) {
            Ok(sync) => report.sync = Some(sync),
            Err(e) => {
                warn!(error = %e, "slide sync failed");
                report.sync_error = Some(e.to_string());
            }
        }
    }

    info!(
        drawings = jobs.len(),
        appended = report
            .drawings
            .iter()
            .filter(|d| matches!(d.append, AppendOutcome::Appended { .. }))
            .count(),
        failed = report.failures.len(),
        "batch finished"
    );
    Ok(report)
}

/// Read a JSON array of drawing jobs.
pub fn load_jobs(path: &Path) -> Result<Vec<DrawingJob>, MasterfileError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
