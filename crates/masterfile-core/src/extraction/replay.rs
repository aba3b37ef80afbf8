use std::path::{Path, PathBuf};

use crate::error::MasterfileError;
use crate::extraction::{ExtractionOracle, RegionImage};

/// Oracle that answers from previously recorded responses on disk.
///
/// The answer for a region is `<dir>/<drawing stem>.<label>.json`, e.g.
/// `MLK PMT 10107 - H-001.bom-1.json`. The file content is returned untouched, so
/// recordings of malformed answers replay as malformed answers.
#[derive(Debug, Clone)]
pub struct ReplayOracle {
    dir: PathBuf,
}

impl ReplayOracle {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ReplayOracle { dir: dir.into() }
    }

    pub fn response_path(&self, region: &RegionImage) -> PathBuf {
        let stem = Path::new(&region.drawing)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| region.drawing.clone());
        self.dir.join(format!("{stem}.{}.json", region.label))
    }
}

impl ExtractionOracle for ReplayOracle {
    fn extract(&self, region: &RegionImage, _instruction: &str) -> Result<String, MasterfileError> {
        let path = self.response_path(region);
        std::fs::read_to_string(&path)
            .map_err(|e| MasterfileError::Oracle(format!("{}: {e}", path.display())))
    }

    fn backend_name(&self) -> &str {
        "replay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::PixelRect;

    fn region(label: &str) -> RegionImage {
        RegionImage {
            drawing: "uploads/MLK PMT 10101 - V-001.pdf".into(),
            label: label.into(),
            page_image: PathBuf::from("page-1.png"),
            rect: PixelRect {
                left: 0,
                upper: 0,
                right: 1,
                lower: 1,
            },
        }
    }

    #[test]
    fn test_reads_recorded_answer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("MLK PMT 10101 - V-001.design.json"),
            r#"{"insulation": "YES"}"#,
        )
        .unwrap();

        let oracle = ReplayOracle::new(dir.path());
        let text = oracle.extract(&region("design"), "ignored").unwrap();
        assert!(text.contains("insulation"));
    }

    #[test]
    fn test_missing_recording_is_oracle_error() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ReplayOracle::new(dir.path());
        assert!(matches!(
            oracle.extract(&region("bom-1"), ""),
            Err(MasterfileError::Oracle(_))
        ));
    }
}
