//! Persistence of [`RuleRecord`]s and change notification.

mod kv;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::RuleRecord;

pub use kv::{KvStore, DEFAULT_STORAGE_KEY};

/// Notification that the stored rule collection changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The full collection after the change.
    Changed(Vec<RuleRecord>),
    /// The collection changed out of band; fetch it again.
    RulesUpdated,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on rule store: {0}")]
    Io(#[from] std::io::Error),

    #[error("rule store document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rule store document has no list under key '{key}'")]
    BadDocument { key: String },
}

/// An ordered collection of rule records.
///
/// Every successful mutation publishes [`StoreEvent::Changed`] to subscribers.
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<RuleRecord>, StoreError>;

    /// Insert `record`, or replace the record with the same id in place.
    async fn put(&self, record: RuleRecord) -> Result<(), StoreError>;

    /// Returns `true` if a record was removed.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Replace the whole collection.
    async fn replace_all(&self, records: Vec<RuleRecord>) -> Result<(), StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;

    /// Publish [`StoreEvent::RulesUpdated`] without changing anything.
    fn notify_rules_updated(&self);
}
