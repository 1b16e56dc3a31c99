use std::sync::Arc;

use prosody_core::merge::{resolve, MergeWinner};
use prosody_core::model::{PersistedDocument, RemoteRecord, UserId};
use prosody_core::Clock;
use tracing::{debug, info, warn};

use super::remote::RemoteBackend;
use super::status::SyncStatusTracker;
use crate::error::SyncError;
use crate::persisted_store::PersistedStore;

/// Moves the document between local storage and the remote table.
///
/// Calls are not sequenced against each other; when two overlap, the last
/// one to finish wins.
#[derive(Clone)]
pub struct CloudSyncEngine {
    clock: Clock,
    store: PersistedStore,
    remote: Arc<dyn RemoteBackend>,
    status: Arc<SyncStatusTracker>,
}

impl CloudSyncEngine {
    #[must_use]
    pub fn new(
        clock: Clock,
        store: PersistedStore,
        remote: Arc<dyn RemoteBackend>,
        status: Arc<SyncStatusTracker>,
    ) -> Self {
        Self {
            clock,
            store,
            remote,
            status,
        }
    }

    #[must_use]
    pub fn status(&self) -> &Arc<SyncStatusTracker> {
        &self.status
    }

    /// Uploads the stored document as the user's record.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::RemoteUnavailable` if the upsert fails.
    pub async fn push(&self, user_id: &UserId) -> Result<RemoteRecord, SyncError> {
        let local = self.store.load().await;
        let record = RemoteRecord::new(user_id.clone(), local, self.clock.now());
        self.remote.upsert(&record).await?;
        debug!(user = %user_id, sections = record.data.len(), "pushed document");
        Ok(record)
    }

    /// Downloads the user's document; a user without a record gets an empty one.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::RemoteUnavailable` if the fetch fails.
    pub async fn pull(&self, user_id: &UserId) -> Result<PersistedDocument, SyncError> {
        let record = self.remote.fetch(user_id).await?;
        match record {
            Some(record) => Ok(record.data),
            None => {
                debug!(user = %user_id, "no remote record yet");
                Ok(PersistedDocument::new())
            }
        }
    }

    /// Last-write-wins on `appSettings.lastUpdated`; ties keep `local`.
    #[must_use]
    pub fn merge(&self, local: PersistedDocument, remote: PersistedDocument) -> PersistedDocument {
        match resolve(&local, &remote) {
            MergeWinner::Local => {
                debug!(local = %local.last_updated(), remote = %remote.last_updated(), "local document kept");
                local
            }
            MergeWinner::Remote => {
                debug!(local = %local.last_updated(), remote = %remote.last_updated(), "remote document adopted");
                remote
            }
        }
    }

    /// Pull, merge, write locally, then push the merged document.
    ///
    /// A failed pull leaves local state untouched. A failed push is reported
    /// but the merged document has already been stored locally.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::RemoteUnavailable` if either remote call fails and
    /// `SyncError::Local` if the merged document cannot be stored.
    pub async fn full_sync(&self, user_id: &UserId) -> Result<PersistedDocument, SyncError> {
        self.status.begin();
        match self.run_full_sync(user_id).await {
            Ok(merged) => {
                self.status.succeed(self.clock.now());
                info!(user = %user_id, "sync complete");
                Ok(merged)
            }
            Err(err) => {
                warn!(user = %user_id, error = %err, "sync failed");
                self.status.fail(err.to_string());
                Err(err)
            }
        }
    }

    async fn run_full_sync(&self, user_id: &UserId) -> Result<PersistedDocument, SyncError> {
        let remote = self.pull(user_id).await?;
        let local = self.store.load().await;
        let merged = self.merge(local, remote);
        self.store.try_write(&merged).await?;
        self.push(user_id).await?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::InMemoryRemote;
    use prosody_core::time::fixed_clock;
    use serde_json::json;
    use storage::repository::Storage;

    fn engine() -> (CloudSyncEngine, PersistedStore, InMemoryRemote) {
        let storage = Storage::in_memory();
        let store = PersistedStore::with_default_key(storage.documents);
        let remote = InMemoryRemote::new();
        let engine = CloudSyncEngine::new(
            fixed_clock(),
            store.clone(),
            Arc::new(remote.clone()),
            Arc::new(SyncStatusTracker::new()),
        );
        (engine, store, remote)
    }

    #[tokio::test]
    async fn pull_without_record_is_empty() {
        let (engine, _, _) = engine();
        let user = UserId::new("u1").unwrap();
        assert!(engine.pull(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_stores_local_document() {
        let (engine, store, remote) = engine();
        let user = UserId::new("u1").unwrap();
        let mut doc = PersistedDocument::new();
        doc.set_value("fillerPrompts", json!({ "count": 3 }));
        store.write(&doc).await;

        engine.push(&user).await.unwrap();
        assert_eq!(remote.record(&user).unwrap().data, doc);
    }

    #[tokio::test]
    async fn failed_sync_marks_status() {
        let (engine, _, remote) = engine();
        remote.set_available(false);
        let user = UserId::new("u1").unwrap();

        let err = engine.full_sync(&user).await.unwrap_err();
        assert!(matches!(err, SyncError::RemoteUnavailable(_)));
        assert!(matches!(
            engine.status().snapshot().phase,
            crate::cloud::SyncPhase::Error(_)
        ));
    }
}
