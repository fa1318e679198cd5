use std::collections::HashMap;
use std::fmt;

use super::error::MalformedRuleError;
use super::rule::CompiledRule;

/// Result of one compilation pass: the emitted rules plus every record that
/// was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[must_use]
pub struct Compilation {
    rules: Vec<CompiledRule>,
    skipped: Vec<MalformedRuleError>,
}

impl Compilation {
    pub(crate) fn new(rules: Vec<CompiledRule>, skipped: Vec<MalformedRuleError>) -> Self {
        Self { rules, skipped }
    }

    /// Compiled rules, ids `1..=n` in input order.
    #[must_use]
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Records that failed to compile, in input order.
    #[must_use]
    pub fn skipped(&self) -> &[MalformedRuleError] {
        &self.skipped
    }

    #[must_use]
    pub fn into_rules(self) -> Vec<CompiledRule> {
        self.rules
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// URL filters emitted by more than one rule, with the ids that share
    /// them. Ordered by first appearance.
    #[must_use]
    pub fn duplicate_filters(&self) -> Vec<(&str, Vec<u32>)> {
        let mut order: Vec<&str> = Vec::new();
        let mut ids: HashMap<&str, Vec<u32>> = HashMap::new();
        for rule in &self.rules {
            let filter = rule.url_filter();
            let entry = ids.entry(filter).or_default();
            if entry.is_empty() {
                order.push(filter);
            }
            entry.push(rule.id);
        }
        order
            .into_iter()
            .filter_map(|filter| {
                let shared = ids.remove(filter)?;
                (shared.len() > 1).then_some((filter, shared))
            })
            .collect()
    }
}

impl fmt::Display for Compilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Compilation({} rules, {} skipped)",
            self.rules.len(),
            self.skipped.len()
        )
    }
}
