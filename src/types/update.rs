use serde::{Deserialize, Serialize};

use super::rule::CompiledRule;

/// One replace request sent to a [`RedirectEngine`](crate::RedirectEngine).
///
/// Removals and additions travel together so the engine can apply them as a
/// single step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    pub remove_rule_ids: Vec<u32>,
    pub add_rules: Vec<CompiledRule>,
}

impl RuleUpdate {
    pub fn replace_all(remove_rule_ids: Vec<u32>, add_rules: Vec<CompiledRule>) -> Self {
        Self {
            remove_rule_ids,
            add_rules,
        }
    }
}
