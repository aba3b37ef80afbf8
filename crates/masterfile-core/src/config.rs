use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::MasterfileError;
use crate::rules::{self, TemplateRuleStore};

pub const DEFAULT_SHEET_NAME: &str = "Masterfile";
pub const DEFAULT_FIRST_DATA_ROW: u32 = 8;

/// Where the templates live and how the masterfile sheet is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterfileConfig {
    /// Reference workbook holding one row block per known equipment.
    pub template_path: PathBuf,
    /// Slide deck copied on first sync.
    pub deck_template_path: PathBuf,
    pub sheet_name: String,
    /// 1-based row of the first data row below the header block.
    pub first_data_row: u32,
    /// Replaces the built-in rule table when set.
    pub rules_file: Option<PathBuf>,
}

impl Default for MasterfileConfig {
    fn default() -> Self {
        MasterfileConfig {
            template_path: PathBuf::from("templates/masterfile_template.xlsx"),
            deck_template_path: PathBuf::from("templates/masterfile_template.pptx"),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            first_data_row: DEFAULT_FIRST_DATA_ROW,
            rules_file: None,
        }
    }
}

impl MasterfileConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, MasterfileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MasterfileError::ConfigInvalid(format!("{}: {e}", path.display()))
        })?;
        let config: MasterfileConfig = serde_json::from_str(&content)
            .map_err(|e| MasterfileError::ConfigInvalid(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MasterfileError> {
        if self.sheet_name.trim().is_empty() {
            return Err(MasterfileError::ConfigInvalid(
                "sheet_name must not be empty".into(),
            ));
        }
        if self.first_data_row < 2 {
            return Err(MasterfileError::ConfigInvalid(format!(
                "first_data_row must leave room for a header row (got {})",
                self.first_data_row
            )));
        }
        Ok(())
    }

    /// The custom rule table when configured, otherwise the built-in one.
    pub fn rule_store(&self) -> Result<RuleStoreRef, MasterfileError> {
        match &self.rules_file {
            Some(path) => Ok(RuleStoreRef::Custom(Box::new(rules::load_store(path)?))),
            None => Ok(RuleStoreRef::Builtin(rules::builtin_store())),
        }
    }
}

/// Either the embedded rule table or one loaded from disk.
#[derive(Debug)]
pub enum RuleStoreRef {
    Builtin(&'static TemplateRuleStore),
    Custom(Box<TemplateRuleStore>),
}

impl std::ops::Deref for RuleStoreRef {
    type Target = TemplateRuleStore;

    fn deref(&self) -> &TemplateRuleStore {
        match self {
            RuleStoreRef::Builtin(store) => store,
            RuleStoreRef::Custom(store) => store,
        }
    }
}
