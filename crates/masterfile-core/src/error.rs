use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MasterfileError {
    #[error("no template pattern for {pmt_no} / {equipment_no}")]
    NotFound { pmt_no: String, equipment_no: String },

    #[error("extraction output is not a JSON object: {0}")]
    MalformedExtraction(String),

    #[error("invalid crop region: {0}")]
    InvalidRegion(String),

    #[error("template not found at {0}. Place the template there or point the config at it")]
    MissingTemplateFile(PathBuf),

    #[error("sheet '{sheet}' not found in {path}")]
    SheetNotFound { sheet: String, path: PathBuf },

    #[error("failed to read workbook {path}: {reason}")]
    Workbook { path: PathBuf, reason: String },

    #[error("malformed package part '{part}': {reason}")]
    Xml { part: String, reason: String },

    #[error("package error: {0}")]
    Package(String),

    #[error("{0} is locked by another append or sync; retry once it finishes")]
    WorkbookBusy(PathBuf),

    #[error("extraction oracle failed: {0}")]
    Oracle(String),

    #[error("failed to load ruleset from {path}: {reason}")]
    RulesetLoad { path: PathBuf, reason: String },

    #[error("invalid ruleset: {0}")]
    RulesetInvalid(String),

    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MasterfileError {
    pub(crate) fn xml(part: &str, reason: impl std::fmt::Display) -> Self {
        MasterfileError::Xml {
            part: part.to_string(),
            reason: reason.to_string(),
        }
    }
}
