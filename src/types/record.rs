use serde::{Deserialize, Serialize};

/// A user-authored redirect rule as it is persisted by a
/// [`RuleStore`](crate::RuleStore).
///
/// Field names serialize in `camelCase` so that stored documents keep the
/// `sourceDomain` / `destinationDomain` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRecord {
    pub id: i64,
    pub source_domain: String,
    pub destination_domain: String,
    pub enabled: bool,
    #[serde(default)]
    pub timestamp: i64,
}

impl RuleRecord {
    /// Create an enabled record. `timestamp` defaults to the id, which is how
    /// records created from the wall clock start out.
    pub fn new(id: i64, source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            id,
            source_domain: source.into(),
            destination_domain: destination.into(),
            enabled: true,
            timestamp: id,
        }
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}
