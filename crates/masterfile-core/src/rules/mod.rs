pub mod builtin;
pub mod schema;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::error::MasterfileError;
use crate::model::EquipmentKey;
use schema::{BomRule, DesignRule, EquipmentRuleDef, RuleSetDef};

pub use builtin::builtin_store;

/// Immutable lookup of per-equipment rules, keyed by the normalized [`EquipmentKey`].
#[derive(Debug, Clone)]
pub struct TemplateRuleStore {
    name: String,
    entries: Vec<EquipmentRuleDef>,
    index: HashMap<EquipmentKey, usize>,
}

impl TemplateRuleStore {
    /// Validate a ruleset and index it.
    pub fn new(ruleset: RuleSetDef) -> Result<Self, MasterfileError> {
        validate_ruleset(&ruleset)?;
        let index = ruleset
            .equipment
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.key(), i))
            .collect();
        Ok(TemplateRuleStore {
            name: ruleset.name,
            entries: ruleset.equipment,
            index,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn iter(&self) -> impl Iterator<Item = &EquipmentRuleDef> {
        self.entries.iter()
    }

    pub fn get(&self, key: &EquipmentKey) -> Option<&EquipmentRuleDef> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn get_design_rule(&self, key: &EquipmentKey) -> Option<&DesignRule> {
        self.get(key).and_then(|e| e.design.as_ref())
    }

    pub fn get_bom_rule(&self, key: &EquipmentKey) -> Option<&BomRule> {
        self.get(key).and_then(|e| e.bom.as_ref())
    }

    /// True when the equipment takes its operating values from the template rows.
    pub fn use_template_operating(&self, key: &EquipmentKey) -> bool {
        self.get(key).is_some_and(|e| e.use_template_operating)
    }

    /// `force_null_operating` of the design rule, false when there is no rule.
    pub fn force_null_operating(&self, key: &EquipmentKey) -> bool {
        self.get_design_rule(key)
            .is_some_and(|r| r.force_null_operating)
    }

    pub fn slide_index(&self, key: &EquipmentKey) -> Option<usize> {
        self.get(key).and_then(|e| e.slide_index)
    }

    /// Every key with a slide, ordered by slide index.
    pub fn slide_map(&self) -> Vec<(EquipmentKey, usize)> {
        let mut map: Vec<(EquipmentKey, usize)> = self
            .entries
            .iter()
            .filter_map(|e| e.slide_index.map(|i| (e.key(), i)))
            .collect();
        map.sort_by_key(|(_, i)| *i);
        map
    }
}

/// Load a rule table from a JSON file.
pub fn load_ruleset(path: &Path) -> Result<RuleSetDef, MasterfileError> {
    let content = std::fs::read_to_string(path).map_err(|e| MasterfileError::RulesetLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_ruleset(&content, path)
}

/// Parse a rule table from a JSON string.
pub fn parse_ruleset(json: &str, source: &Path) -> Result<RuleSetDef, MasterfileError> {
    let ruleset: RuleSetDef =
        serde_json::from_str(json).map_err(|e| MasterfileError::RulesetLoad {
            path: source.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_ruleset(&ruleset)?;
    Ok(ruleset)
}

/// Parse a rule table from a JSON string (no file path context).
pub fn parse_ruleset_str(json: &str) -> Result<RuleSetDef, MasterfileError> {
    let ruleset: RuleSetDef = serde_json::from_str(json).map_err(MasterfileError::Json)?;
    validate_ruleset(&ruleset)?;
    Ok(ruleset)
}

/// Load a custom rule table into a store.
pub fn load_store(path: &Path) -> Result<TemplateRuleStore, MasterfileError> {
    TemplateRuleStore::new(load_ruleset(path)?)
}

/// Validate that a rule table is well-formed.
pub fn validate_ruleset(ruleset: &RuleSetDef) -> Result<(), MasterfileError> {
    if ruleset.equipment.is_empty() {
        return Err(MasterfileError::RulesetInvalid(
            "equipment must not be empty".into(),
        ));
    }

    let mut keys = HashSet::new();
    let mut slides = HashSet::new();

    for entry in &ruleset.equipment {
        let key = entry.key();
        if key.normalized_pmt().is_empty() || key.normalized_equipment().is_empty() {
            return Err(MasterfileError::RulesetInvalid(format!(
                "entry '{key}' needs both a PMT number and an equipment number"
            )));
        }

        if let Some(slide) = entry.slide_index {
            if !slides.insert(slide) {
                return Err(MasterfileError::RulesetInvalid(format!(
                    "slide index {slide} is assigned to more than one equipment ('{key}')"
                )));
            }
        }

        if !keys.insert(key.clone()) {
            return Err(MasterfileError::RulesetInvalid(format!(
                "duplicate equipment '{key}'"
            )));
        }
    }

    Ok(())
}
