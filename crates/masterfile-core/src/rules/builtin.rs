use std::sync::LazyLock;

use crate::rules::schema::RuleSetDef;
use crate::rules::TemplateRuleStore;

const EQUIPMENT_RULES_JSON: &str = include_str!("../../rules/equipment-rules.json");

static BUILTIN_STORE: LazyLock<TemplateRuleStore> = LazyLock::new(|| {
    let ruleset: RuleSetDef =
        serde_json::from_str(EQUIPMENT_RULES_JSON).expect("embedded equipment-rules.json is valid");
    TemplateRuleStore::new(ruleset).expect("embedded equipment-rules.json passes validation")
});

/// The rule table shipped with the crate.
pub fn builtin_store() -> &'static TemplateRuleStore {
    &BUILTIN_STORE
}
