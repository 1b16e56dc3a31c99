//! Debounced persistence of section edits.
//!
//! Each wizard section gets a `SectionSaver`. A burst of saves for one section
//! results in a single write of the whole document once the section has been
//! quiet for the configured delay.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use prosody_core::model::PersistedDocument;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::Clock;
use crate::persisted_store::PersistedStore;

struct PendingWrite {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    store: PersistedStore,
    clock: Clock,
    delay: Duration,
    document: Mutex<PersistedDocument>,
    pending: Mutex<HashMap<String, PendingWrite>>,
    generation: Mutex<u64>,
    /// Bumped whenever the document is replaced wholesale.
    epoch: AtomicU64,
    /// Held for the duration of every store write.
    write_lock: tokio::sync::Mutex<()>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn snapshot(&self) -> PersistedDocument {
        lock(&self.document).clone()
    }

    fn next_generation(&self) -> u64 {
        let mut generation = lock(&self.generation);
        *generation += 1;
        *generation
    }

    /// Writes the current document unless it was replaced since `epoch`.
    async fn write_if_current(&self, epoch: u64) -> bool {
        let _guard = self.write_lock.lock().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        let snapshot = self.snapshot();
        self.store.write(&snapshot).await;
        true
    }

    fn cancel_pending(&self) -> usize {
        let drained: Vec<PendingWrite> = lock(&self.pending)
            .drain()
            .map(|(_, pending)| pending)
            .collect();
        for pending in &drained {
            pending.handle.abort();
        }
        drained.len()
    }
}

/// Session-scoped owner of the in-memory document and its pending writes.
///
/// Must be used from within a tokio runtime: scheduling spawns timer tasks.
#[derive(Clone)]
pub struct AutoSaveController {
    inner: Arc<Inner>,
}

impl AutoSaveController {
    /// Creates a controller seeded with `document`, usually the result of
    /// `PersistedStore::load`.
    #[must_use]
    pub fn new(
        store: PersistedStore,
        document: PersistedDocument,
        clock: Clock,
        delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                clock,
                delay,
                document: Mutex::new(document),
                pending: Mutex::new(HashMap::new()),
                generation: Mutex::new(0),
                epoch: AtomicU64::new(0),
                write_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Loads the stored document and wraps it in a controller.
    pub async fn load(store: PersistedStore, clock: Clock, delay: Duration) -> Self {
        let document = store.load().await;
        Self::new(store, document, clock, delay)
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    /// Save handle for one section.
    #[must_use]
    pub fn section(&self, name: impl Into<String>) -> SectionSaver {
        SectionSaver {
            controller: self.clone(),
            name: name.into(),
        }
    }

    /// Copy of the current in-memory document, including unsaved edits.
    #[must_use]
    pub fn document(&self) -> PersistedDocument {
        self.inner.snapshot()
    }

    /// Sections with a write still waiting for its delay.
    #[must_use]
    pub fn pending_sections(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.inner.pending)
            .iter()
            .filter(|(_, pending)| !pending.handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Merges `partial` into `section`, stamps the document and reschedules
    /// that section's write.
    pub fn save(&self, section: &str, partial: Map<String, Value>) {
        {
            let mut doc = lock(&self.inner.document);
            doc.merge_section(section, partial);
            doc.touch(self.inner.clock.now());
        }
        self.schedule(section);
    }

    fn schedule(&self, section: &str) {
        let generation = self.inner.next_generation();
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        let name = section.to_owned();

        let mut pending = lock(&self.inner.pending);
        if let Some(previous) = pending.remove(section) {
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            {
                let mut pending = lock(&inner.pending);
                if pending.get(&name).is_some_and(|p| p.generation == generation) {
                    pending.remove(&name);
                }
            }
            debug!(section = %name, "autosave firing");
            if !inner.write_if_current(epoch).await {
                debug!(section = %name, "document replaced; autosave dropped");
            }
        });

        pending.insert(section.to_owned(), PendingWrite { generation, handle });
    }

    /// Cancels every pending timer and writes the document now.
    pub async fn flush(&self) {
        let cancelled = self.inner.cancel_pending();
        if cancelled > 0 {
            debug!(cancelled, "autosave flushed early");
        }
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        self.inner.write_if_current(epoch).await;
    }

    /// Swaps in a document produced elsewhere (import, sync, clear) and
    /// stores it.
    ///
    /// Pending timers are cancelled. A timer write already in flight finishes
    /// before `document` is stored, and none can land after it.
    pub async fn replace_document(&self, document: PersistedDocument) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.cancel_pending();
        *lock(&self.inner.document) = document;

        let _guard = self.inner.write_lock.lock().await;
        let snapshot = self.inner.snapshot();
        self.inner.store.write(&snapshot).await;
    }
}

/// Debounced save function bound to one section.
#[derive(Clone)]
pub struct SectionSaver {
    controller: AutoSaveController,
    name: String,
}

impl SectionSaver {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Merges `partial` into the section and schedules a write.
    pub fn save(&self, partial: Map<String, Value>) {
        self.controller.save(&self.name, partial);
    }

    /// Serializes `state` and saves its fields. Non-object states are ignored.
    pub fn save_state<T: Serialize>(&self, state: &T) {
        match serde_json::to_value(state) {
            Ok(Value::Object(fields)) => self.save(fields),
            Ok(other) => warn!(section = %self.name, kind = ?other, "ignoring non-object section state"),
            Err(err) => warn!(section = %self.name, error = %err, "failed to encode section state"),
        }
    }
}
