use std::fmt;

use serde::{Deserialize, Serialize};

/// Priority given to every compiled redirect rule.
pub const REDIRECT_PRIORITY: u32 = 1;

/// A declarative redirect rule in the shape the native engine accepts.
///
/// Produced by [`compile()`](crate::compile()) and installed through a
/// [`RedirectEngine`](crate::RedirectEngine). Serializes to the engine's JSON
/// shape, e.g. `condition.urlFilter` and `action.redirect.transform`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledRule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

/// What the engine does with a matching request. Only redirects are produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleAction {
    Redirect { redirect: Redirect },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub transform: UrlTransform,
}

/// Scheme/host/port rewrite. Path, query and fragment of the original request
/// are kept. An empty `port` removes any port from the original request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlTransform {
    pub scheme: String,
    pub host: String,
    pub port: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: Vec<ResourceType>,
}

/// Request categories understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    MainFrame,
    SubFrame,
    Stylesheet,
    Script,
    Image,
    #[serde(rename = "xmlhttprequest")]
    XmlHttpRequest,
    Other,
}

impl CompiledRule {
    pub(crate) fn redirect(id: u32, url_filter: String, transform: UrlTransform) -> Self {
        Self {
            id,
            priority: REDIRECT_PRIORITY,
            action: RuleAction::Redirect {
                redirect: Redirect { transform },
            },
            condition: RuleCondition {
                url_filter,
                resource_types: vec![ResourceType::MainFrame],
            },
        }
    }

    #[must_use]
    pub fn url_filter(&self) -> &str {
        &self.condition.url_filter
    }

    #[must_use]
    pub fn transform(&self) -> &UrlTransform {
        match &self.action {
            RuleAction::Redirect { redirect } => &redirect.transform,
        }
    }

    /// Whether this rule applies to requests of the given type.
    #[must_use]
    pub fn applies_to(&self, resource_type: ResourceType) -> bool {
        self.condition.resource_types.contains(&resource_type)
    }
}

impl fmt::Display for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.transform();
        write!(f, "#{} {} => {}://{}", self.id, self.url_filter(), t.scheme, t.host)?;
        if !t.port.is_empty() {
            write!(f, ":{}", t.port)?;
        }
        Ok(())
    }
}
