use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use super::{RuleStore, StoreError, StoreEvent};
use crate::{Config, RuleRecord};

/// Key under which the record list is stored.
pub const DEFAULT_STORAGE_KEY: &str = "redirectRules";

const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Flat key-value rule store.
///
/// The backing document is a JSON object; the record list lives under one key
/// and every other key is carried through untouched. Without a path the store
/// lives in memory only.
#[derive(Debug)]
pub struct KvStore {
    path: Option<PathBuf>,
    key: String,
    state: Mutex<Document>,
    events: broadcast::Sender<StoreEvent>,
}

#[derive(Debug, Default)]
struct Document {
    records: Vec<RuleRecord>,
    others: Map<String, Value>,
}

impl KvStore {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_records(Vec::new())
    }

    #[must_use]
    pub fn with_records(records: Vec<RuleRecord>) -> Self {
        Self::build(
            None,
            DEFAULT_STORAGE_KEY.to_owned(),
            Document {
                records,
                others: Map::new(),
            },
            DEFAULT_EVENT_CAPACITY,
        )
    }

    /// Open a file-backed store. A missing file opens as an empty store and is
    /// created on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be read or is not a JSON
    /// object holding a record list under `key`.
    pub async fn open(path: impl AsRef<Path>, key: &str) -> Result<Self, StoreError> {
        Self::open_with_capacity(path, key, DEFAULT_EVENT_CAPACITY).await
    }

    /// Open the store described by `config`.
    ///
    /// # Errors
    ///
    /// Same as [`open()`](Self::open).
    pub async fn from_config(config: &Config) -> Result<Self, StoreError> {
        match &config.store_path {
            Some(path) => Self::open_with_capacity(path, &config.storage_key, config.event_capacity).await,
            None => Ok(Self::build(
                None,
                config.storage_key.clone(),
                Document::default(),
                config.event_capacity,
            )),
        }
    }

    async fn open_with_capacity(
        path: impl AsRef<Path>,
        key: &str,
        capacity: usize,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let document = match tokio::fs::read_to_string(&path).await {
            Ok(text) => parse_document(&text, key)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Document::default(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), records = document.records.len(), "opened rule store");
        Ok(Self::build(Some(path), key.to_owned(), document, capacity))
    }

    fn build(path: Option<PathBuf>, key: String, document: Document, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            path,
            key,
            state: Mutex::new(document),
            events,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<RuleRecord>) -> T + Send,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock().await;
        let mut records = state.records.clone();
        let result = f(&mut records);
        if let Some(path) = &self.path {
            persist(path, &self.key, &records, &state.others).await?;
        }
        state.records = records;

        // Sent under the lock so events arrive in write order. No subscribers
        // is not an error.
        let _ = self
            .events
            .send(StoreEvent::Changed(state.records.clone()));
        Ok(result)
    }
}

#[async_trait]
impl RuleStore for KvStore {
    async fn get_all(&self) -> Result<Vec<RuleRecord>, StoreError> {
        Ok(self.state.lock().await.records.clone())
    }

    async fn put(&self, record: RuleRecord) -> Result<(), StoreError> {
        self.mutate(move |records| {
            match records.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => records.push(record),
            }
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.mutate(move |records| {
            let before = records.len();
            records.retain(|r| r.id != id);
            records.len() != before
        })
        .await
    }

    async fn replace_all(&self, records: Vec<RuleRecord>) -> Result<(), StoreError> {
        self.mutate(move |current| *current = records).await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn notify_rules_updated(&self) {
        let _ = self.events.send(StoreEvent::RulesUpdated);
    }
}

fn parse_document(text: &str, key: &str) -> Result<Document, StoreError> {
    if text.trim().is_empty() {
        return Ok(Document::default());
    }
    let Value::Object(mut others) = serde_json::from_str::<Value>(text)? else {
        return Err(StoreError::BadDocument { key: key.to_owned() });
    };
    let records = match others.remove(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(list @ Value::Array(_)) => serde_json::from_value(list)?,
        Some(_) => return Err(StoreError::BadDocument { key: key.to_owned() }),
    };
    Ok(Document { records, others })
}

async fn persist(
    path: &Path,
    key: &str,
    records: &[RuleRecord],
    others: &Map<String, Value>,
) -> Result<(), StoreError> {
    let mut document = others.clone();
    document.insert(key.to_owned(), serde_json::to_value(records)?);
    let text = serde_json::to_string_pretty(&Value::Object(document))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, text).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
