use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{compile, CompiledRule, MalformedRuleError, NativeSyncError, RedirectEngine, RuleRecord, RuleUpdate};

/// Applies compiled rule sets to a [`RedirectEngine`].
///
/// Every pass replaces the whole installed table: it reads the installed ids,
/// compiles the records, and sends one update that removes all of those ids
/// and adds all compiled rules. Passes never interleave. When several passes
/// are requested while one is running, only the newest of the waiting passes
/// reaches the engine; the others return [`SyncOutcome::Superseded`].
#[derive(Debug)]
pub struct SyncEngine<E> {
    engine: E,
    gate: Mutex<()>,
    requested: AtomicU64,
}

/// What a [`SyncEngine::sync()`] call ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied(SyncReport),
    /// A newer pass was requested before this one reached the engine.
    Superseded { generation: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct SyncReport {
    generation: u64,
    removed: Vec<u32>,
    installed: Vec<CompiledRule>,
    skipped: Vec<MalformedRuleError>,
}

impl<E: RedirectEngine> SyncEngine<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            gate: Mutex::new(()),
            requested: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Number of passes requested so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.requested.load(Ordering::SeqCst)
    }

    /// Replace the engine's rule table with the compilation of `records`.
    ///
    /// Malformed records are skipped and listed in the report. Nothing is
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns the [`NativeSyncError`] reported by the engine when the
    /// installed ids cannot be read or the update is rejected. What the engine
    /// holds afterwards is up to the engine.
    pub async fn sync(&self, records: &[RuleRecord]) -> Result<SyncOutcome, NativeSyncError> {
        let generation = self.requested.fetch_add(1, Ordering::SeqCst) + 1;
        let _gate = self.gate.lock().await;

        if self.requested.load(Ordering::SeqCst) != generation {
            debug!(generation, "sync pass superseded by a newer request");
            return Ok(SyncOutcome::Superseded { generation });
        }

        let removed = self.engine.installed_rule_ids().await.map_err(|err| {
            error!(generation, error = %err, "failed to read installed redirect rules");
            err
        })?;

        let compilation = compile(records);
        let skipped = compilation.skipped().to_vec();
        let installed = compilation.into_rules();

        let update = RuleUpdate::replace_all(removed.clone(), installed.clone());
        if let Err(err) = self.engine.update_rules(update).await {
            error!(generation, error = %err, "redirect engine rejected rule update");
            return Err(err);
        }

        info!(
            generation,
            removed = removed.len(),
            added = installed.len(),
            skipped = skipped.len(),
            "redirect rules replaced"
        );
        Ok(SyncOutcome::Applied(SyncReport {
            generation,
            removed,
            installed,
            skipped,
        }))
    }
}

impl SyncOutcome {
    /// The report, if the pass reached the engine.
    #[must_use]
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Applied(report) => Some(report),
            SyncOutcome::Superseded { .. } => None,
        }
    }

    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, SyncOutcome::Superseded { .. })
    }
}

impl SyncReport {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ids that were installed before the pass and removed by it.
    #[must_use]
    pub fn removed(&self) -> &[u32] {
        &self.removed
    }

    /// Rules the pass installed.
    #[must_use]
    pub fn installed(&self) -> &[CompiledRule] {
        &self.installed
    }

    #[must_use]
    pub fn skipped(&self) -> &[MalformedRuleError] {
        &self.skipped
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sync #{}: removed {}, installed {}, skipped {}",
            self.generation,
            self.removed.len(),
            self.installed.len(),
            self.skipped.len()
        )
    }
}
