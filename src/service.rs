use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, error, info, warn};

use crate::store::{KvStore, RuleStore, StoreEvent};
use crate::{Config, RedirectEngine, RedirectError, RuleBook, RuleRecord, SyncEngine, SyncOutcome};

/// Keeps a [`RedirectEngine`] in step with a [`RuleStore`].
///
/// The table is synced once on [`start()`](Self::start) and again for every
/// store change. A change event carrying records is synced as is; a bare
/// "rules updated" signal makes the service fetch the records first.
#[derive(Debug)]
pub struct RedirectService<S, E> {
    store: Arc<S>,
    sync: SyncEngine<E>,
}

impl<S: RuleStore, E: RedirectEngine> RedirectService<S, E> {
    pub fn new(store: Arc<S>, engine: E) -> Self {
        Self {
            store,
            sync: SyncEngine::new(engine),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    #[must_use]
    pub fn sync_engine(&self) -> &SyncEngine<E> {
        &self.sync
    }

    /// Load every record and install the compiled rules.
    ///
    /// # Errors
    ///
    /// Returns [`RedirectError`] if the store cannot be read or the engine
    /// rejects the update.
    pub async fn start(&self) -> Result<SyncOutcome, RedirectError> {
        let records = self.store.get_all().await?;
        info!(records = records.len(), "initial redirect rule sync");
        Ok(self.sync.sync(&records).await?)
    }

    /// React to one store event.
    ///
    /// # Errors
    ///
    /// Returns [`RedirectError`] if a re-fetch fails or the engine rejects the
    /// update.
    pub async fn handle(&self, event: StoreEvent) -> Result<SyncOutcome, RedirectError> {
        let records = match event {
            StoreEvent::Changed(records) => records,
            StoreEvent::RulesUpdated => self.store.get_all().await?,
        };
        Ok(self.sync.sync(&records).await?)
    }

    /// Process events until the store's channel closes. Events that queued
    /// up while a sync was running are collapsed into the newest one. Errors
    /// are logged and the loop carries on.
    pub async fn run(&self, mut events: broadcast::Receiver<StoreEvent>) {
        loop {
            let event = match events.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "missed rule store events; re-fetching rules");
                    StoreEvent::RulesUpdated
                }
                Err(RecvError::Closed) => {
                    debug!("rule store event channel closed");
                    break;
                }
            };
            let event = newest(event, &mut events);
            if let Err(err) = self.handle(event).await {
                error!(error = %err, "redirect rule sync failed");
            }
        }
    }

    /// Add or update one redirect and save the whole list. The store's change
    /// event drives the sync.
    ///
    /// # Errors
    ///
    /// Returns [`RedirectError::Book`] for blank input and
    /// [`RedirectError::Store`] if the list cannot be read or written.
    pub async fn submit(
        &self,
        source: &str,
        destination: &str,
        now: i64,
    ) -> Result<RuleRecord, RedirectError> {
        let mut book = RuleBook::from_records(self.store.get_all().await?);
        let record = book.submit(source, destination, now)?.clone();
        self.store.replace_all(book.into_records()).await?;
        info!(record_id = record.id, source = %record.source_domain, "redirect saved");
        Ok(record)
    }

    /// Merge a redirect list into the stored records and save them.
    /// Returns the number of entries applied.
    ///
    /// # Errors
    ///
    /// Returns [`RedirectError::Parse`] if the list does not parse, in which
    /// case nothing is written, and [`RedirectError::Store`] on storage
    /// failure.
    pub async fn import_list(&self, list: &str, now: i64) -> Result<usize, RedirectError> {
        let mut book = RuleBook::from_records(self.store.get_all().await?);
        let applied = book.import(list, now)?;
        self.store.replace_all(book.into_records()).await?;
        info!(applied, "redirect list imported");
        Ok(applied)
    }

    /// Subscribe, run the initial sync, then [`run()`](Self::run).
    ///
    /// A failed initial sync is logged; change events are still processed.
    pub async fn serve(&self) {
        let events = self.store.subscribe();
        if let Err(err) = self.start().await {
            error!(error = %err, "initial redirect rule sync failed");
        }
        self.run(events).await;
    }
}

impl<E: RedirectEngine> RedirectService<KvStore, E> {
    /// Read [`Config`] from the environment and open its store.
    ///
    /// # Errors
    ///
    /// Returns [`RedirectError::Config`] for a bad variable and
    /// [`RedirectError::Store`] if the store cannot be opened.
    pub async fn from_env(engine: E) -> Result<(Self, Config), RedirectError> {
        let config = Config::from_env()?;
        let service = Self::from_config(&config, engine).await?;
        Ok((service, config))
    }

    /// # Errors
    ///
    /// Returns [`RedirectError::Store`] if the store cannot be opened.
    pub async fn from_config(config: &Config, engine: E) -> Result<Self, RedirectError> {
        let store = KvStore::from_config(config).await?;
        Ok(Self::new(Arc::new(store), engine))
    }
}

fn newest(mut current: StoreEvent, events: &mut broadcast::Receiver<StoreEvent>) -> StoreEvent {
    let mut dropped = 0_usize;
    loop {
        match events.try_recv() {
            Ok(event) => {
                current = event;
                dropped += 1;
            }
            Err(TryRecvError::Lagged(_)) => {
                current = StoreEvent::RulesUpdated;
                dropped += 1;
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    if dropped > 0 {
        debug!(dropped, "collapsed queued rule store events");
    }
    current
}
