//! The native redirect engine seam.
//!
//! [`RedirectEngine`] is the two-call surface the sync engine needs from a
//! browser's declarative rule table: list installed ids, and replace rules in
//! one update. [`InMemoryEngine`] is a process-local table with the same
//! validation rules, used for tests, demos and headless embedding.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use thiserror::Error;
use url::Url;
use wildmatch::WildMatch;

use crate::{CompiledRule, ResourceType, RuleUpdate};

/// Upper bound on dynamic rules held by [`InMemoryEngine`].
pub const MAX_DYNAMIC_RULES: usize = 30_000;

/// The engine rejected a request or could not serve it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeSyncError {
    #[error("rule id {id} is already installed or repeated in the update")]
    DuplicateRuleId { id: u32 },

    #[error("rule id {id} is invalid; ids start at 1")]
    InvalidRuleId { id: u32 },

    #[error("rule {id} has an invalid urlFilter: {reason}")]
    InvalidUrlFilter { id: u32, reason: String },

    #[error("update would install {requested} rules; the engine allows {limit}")]
    RuleLimitExceeded { limit: usize, requested: usize },

    #[error("redirect engine unavailable: {0}")]
    Unavailable(String),
}

/// A declarative redirect rule table.
#[async_trait]
pub trait RedirectEngine: Send + Sync {
    /// Ids of every currently installed rule.
    async fn installed_rule_ids(&self) -> Result<Vec<u32>, NativeSyncError>;

    /// Remove `update.remove_rule_ids` and add `update.add_rules` together.
    async fn update_rules(&self, update: RuleUpdate) -> Result<(), NativeSyncError>;
}

#[async_trait]
impl<E: RedirectEngine + ?Sized> RedirectEngine for Arc<E> {
    async fn installed_rule_ids(&self) -> Result<Vec<u32>, NativeSyncError> {
        (**self).installed_rule_ids().await
    }

    async fn update_rules(&self, update: RuleUpdate) -> Result<(), NativeSyncError> {
        (**self).update_rules(update).await
    }
}

/// In-process rule table.
///
/// Updates are validated in full before any change is made, so a rejected
/// update leaves the table untouched. Removing an id that is not installed is
/// not an error.
#[derive(Debug)]
pub struct InMemoryEngine {
    rules: RwLock<BTreeMap<u32, CompiledRule>>,
    limit: usize,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(MAX_DYNAMIC_RULES)
    }

    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            rules: RwLock::new(BTreeMap::new()),
            limit,
        }
    }

    /// Start from an already populated table, as left by a previous session.
    /// Later rules overwrite earlier ones with the same id.
    #[must_use]
    pub fn with_rules(rules: impl IntoIterator<Item = CompiledRule>) -> Self {
        let engine = Self::new();
        {
            let mut table = engine.write();
            for rule in rules {
                table.insert(rule.id, rule);
            }
        }
        engine
    }

    /// Snapshot of the installed rules ordered by id.
    #[must_use]
    pub fn rules(&self) -> Vec<CompiledRule> {
        self.read().values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Rewrite `url` with the installed rule that matches it, if any.
    ///
    /// Among matching rules the highest priority wins; equal priorities are
    /// resolved in favour of the higher id. Path, query and fragment are kept.
    #[must_use]
    pub fn redirect(&self, url: &Url, resource_type: ResourceType) -> Option<Url> {
        let table = self.read();
        let rule = table
            .values()
            .filter(|rule| rule.applies_to(resource_type))
            .filter(|rule| WildMatch::new(rule.url_filter()).matches(url.as_str()))
            .max_by_key(|rule| (rule.priority, rule.id))?;
        apply_transform(url, rule)
    }

    fn validate(
        &self,
        table: &BTreeMap<u32, CompiledRule>,
        update: &RuleUpdate,
    ) -> Result<(), NativeSyncError> {
        let mut remaining: Vec<u32> = table
            .keys()
            .copied()
            .filter(|id| !update.remove_rule_ids.contains(id))
            .collect();

        for rule in &update.add_rules {
            if rule.id == 0 {
                return Err(NativeSyncError::InvalidRuleId { id: rule.id });
            }
            validate_filter(rule)?;
            if remaining.contains(&rule.id) {
                return Err(NativeSyncError::DuplicateRuleId { id: rule.id });
            }
            remaining.push(rule.id);
        }

        if remaining.len() > self.limit {
            return Err(NativeSyncError::RuleLimitExceeded {
                limit: self.limit,
                requested: remaining.len(),
            });
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<u32, CompiledRule>> {
        self.rules.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<u32, CompiledRule>> {
        self.rules.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RedirectEngine for InMemoryEngine {
    async fn installed_rule_ids(&self) -> Result<Vec<u32>, NativeSyncError> {
        Ok(self.read().keys().copied().collect())
    }

    async fn update_rules(&self, update: RuleUpdate) -> Result<(), NativeSyncError> {
        let mut table = self.write();
        self.validate(&table, &update)?;
        for id in &update.remove_rule_ids {
            table.remove(id);
        }
        for rule in update.add_rules {
            table.insert(rule.id, rule);
        }
        Ok(())
    }
}

fn validate_filter(rule: &CompiledRule) -> Result<(), NativeSyncError> {
    let filter = rule.url_filter();
    let reason = if filter.is_empty() {
        "filter is empty"
    } else if !filter.is_ascii() {
        "filter must be ASCII"
    } else {
        return Ok(());
    };
    Err(NativeSyncError::InvalidUrlFilter {
        id: rule.id,
        reason: reason.to_owned(),
    })
}

fn apply_transform(url: &Url, rule: &CompiledRule) -> Option<Url> {
    let transform = rule.transform();
    let mut target = format!("{}://{}", transform.scheme, transform.host);
    if !transform.port.is_empty() {
        target.push(':');
        target.push_str(&transform.port);
    }
    target.push_str(url.path());
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        target.push('#');
        target.push_str(fragment);
    }
    Url::parse(&target).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compile, RuleRecord};

    fn rules_for(pairs: &[(&str, &str)]) -> Vec<CompiledRule> {
        let records: Vec<RuleRecord> = pairs
            .iter()
            .enumerate()
            .map(|(i, (src, dst))| RuleRecord::new(i as i64 + 1, *src, *dst))
            .collect();
        compile(&records).into_rules()
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn replace_installs_rules() {
        let engine = InMemoryEngine::new();
        let rules = rules_for(&[("https://a.example", "https://b.example")]);
        engine
            .update_rules(RuleUpdate::replace_all(vec![], rules.clone()))
            .await
            .unwrap();
        assert_eq!(engine.rules(), rules);
        assert_eq!(engine.installed_rule_ids().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn duplicate_id_rejected_atomically() {
        let existing = rules_for(&[("https://a.example", "https://b.example")]);
        let engine = InMemoryEngine::with_rules(existing.clone());
        let result = engine
            .update_rules(RuleUpdate::replace_all(vec![], existing.clone()))
            .await;
        assert_eq!(result, Err(NativeSyncError::DuplicateRuleId { id: 1 }));
        assert_eq!(engine.rules(), existing);
    }

    #[tokio::test]
    async fn removing_unknown_ids_is_ignored() {
        let engine = InMemoryEngine::new();
        engine
            .update_rules(RuleUpdate::replace_all(vec![41, 42], vec![]))
            .await
            .unwrap();
        assert!(engine.is_empty());
    }

    #[tokio::test]
    async fn zero_id_rejected() {
        let mut rules = rules_for(&[("https://a.example", "https://b.example")]);
        rules[0].id = 0;
        let engine = InMemoryEngine::new();
        let result = engine.update_rules(RuleUpdate::replace_all(vec![], rules)).await;
        assert_eq!(result, Err(NativeSyncError::InvalidRuleId { id: 0 }));
    }

    #[tokio::test]
    async fn empty_filter_rejected() {
        let mut rules = rules_for(&[("https://a.example", "https://b.example")]);
        rules[0].condition.url_filter.clear();
        let engine = InMemoryEngine::new();
        let result = engine.update_rules(RuleUpdate::replace_all(vec![], rules)).await;
        assert!(matches!(result, Err(NativeSyncError::InvalidUrlFilter { id: 1, .. })));
    }

    #[tokio::test]
    async fn limit_enforced() {
        let rules = rules_for(&[
            ("https://a.example", "https://b.example"),
            ("https://c.example", "https://d.example"),
        ]);
        let engine = InMemoryEngine::with_limit(1);
        let result = engine.update_rules(RuleUpdate::replace_all(vec![], rules)).await;
        assert_eq!(
            result,
            Err(NativeSyncError::RuleLimitExceeded { limit: 1, requested: 2 })
        );
    }

    #[test]
    fn redirect_rewrites_origin_and_keeps_path() {
        let engine = InMemoryEngine::with_rules(rules_for(&[(
            "https://old.example.com",
            "https://new.example.org:8443/ignored",
        )]));
        let out = engine
            .redirect(&url("https://old.example.com/a/b?q=1#top"), ResourceType::MainFrame)
            .unwrap();
        assert_eq!(out.as_str(), "https://new.example.org:8443/a/b?q=1#top");
    }

    #[test]
    fn redirect_strips_port_when_transform_has_none() {
        let engine = InMemoryEngine::with_rules(rules_for(&[(
            "http://localhost:3000",
            "https://prod.example.com",
        )]));
        let out = engine
            .redirect(&url("http://localhost:3000/dashboard"), ResourceType::MainFrame)
            .unwrap();
        assert_eq!(out.as_str(), "https://prod.example.com/dashboard");
    }

    #[test]
    fn redirect_ignores_other_origins_and_resource_types() {
        let engine = InMemoryEngine::with_rules(rules_for(&[(
            "https://old.example.com",
            "https://new.example.org",
        )]));
        assert!(engine
            .redirect(&url("https://old.example.com.evil.test/"), ResourceType::MainFrame)
            .is_none());
        assert!(engine
            .redirect(&url("https://old.example.com:8443/"), ResourceType::MainFrame)
            .is_none());
        assert!(engine
            .redirect(&url("https://old.example.com/app.js"), ResourceType::Script)
            .is_none());
    }

    #[test]
    fn equal_priority_resolved_by_higher_id() {
        let engine = InMemoryEngine::with_rules(rules_for(&[
            ("https://a.example", "https://first.example"),
            ("https://a.example", "https://second.example"),
        ]));
        let out = engine
            .redirect(&url("https://a.example/"), ResourceType::MainFrame)
            .unwrap();
        assert_eq!(out.host_str(), Some("second.example"));
    }
}
