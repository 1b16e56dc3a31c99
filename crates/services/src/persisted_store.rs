use std::sync::Arc;

use prosody_core::model::{PersistedDocument, DEFAULT_STORAGE_KEY};
use storage::repository::{DocumentRepository, StorageError};
use tracing::{debug, warn};

/// Durable home of the whole document, stored as one JSON blob under one key.
///
/// Reads never fail: a missing, unreadable or corrupt entry reads as an empty
/// document.
#[derive(Clone)]
pub struct PersistedStore {
    repo: Arc<dyn DocumentRepository>,
    key: String,
}

impl PersistedStore {
    #[must_use]
    pub fn new(repo: Arc<dyn DocumentRepository>, key: impl Into<String>) -> Self {
        Self {
            repo,
            key: key.into(),
        }
    }

    #[must_use]
    pub fn with_default_key(repo: Arc<dyn DocumentRepository>) -> Self {
        Self::new(repo, DEFAULT_STORAGE_KEY)
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the stored document, or an empty one.
    pub async fn load(&self) -> PersistedDocument {
        let raw = match self.repo.get_blob(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return PersistedDocument::new(),
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to read stored document");
                return PersistedDocument::new();
            }
        };

        match PersistedDocument::from_json_str(&raw) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(key = %self.key, error = %err, "stored document is corrupt; treating as empty");
                PersistedDocument::new()
            }
        }
    }

    /// Overwrites the stored document in full, logging instead of failing.
    pub async fn write(&self, document: &PersistedDocument) {
        if let Err(err) = self.try_write(document).await {
            warn!(key = %self.key, error = %err, "failed to write document");
        }
    }

    /// Overwrites the stored document in full.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the backend write fails.
    pub async fn try_write(&self, document: &PersistedDocument) -> Result<(), StorageError> {
        let text = document
            .to_json_string()
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.repo.put_blob(&self.key, &text).await?;
        debug!(key = %self.key, sections = document.len(), "document written");
        Ok(())
    }

    /// Removes the stored document; the next `load` returns an empty one.
    pub async fn clear(&self) {
        match self.repo.delete_blob(&self.key).await {
            Ok(()) => debug!(key = %self.key, "document cleared"),
            Err(err) => warn!(key = %self.key, error = %err, "failed to clear document"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use storage::repository::InMemoryRepository;

    fn store() -> (PersistedStore, Arc<InMemoryRepository>) {
        let repo = Arc::new(InMemoryRepository::new());
        let store = PersistedStore::with_default_key(Arc::clone(&repo) as Arc<dyn DocumentRepository>);
        (store, repo)
    }

    #[tokio::test]
    async fn missing_entry_loads_empty() {
        let (store, _) = store();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn write_then_load_round_trips() {
        let (store, _) = store();
        let mut doc = PersistedDocument::new();
        doc.set_value("appSettings", json!({ "activePhase": "numeric" }));
        doc.set_value("prosodyAnnotation", json!({ "preset": "calm" }));

        store.write(&doc).await;
        assert_eq!(store.load().await, doc);
    }

    #[tokio::test]
    async fn corrupt_entry_loads_empty() {
        let (store, repo) = store();
        repo.put_blob(DEFAULT_STORAGE_KEY, "definitely not json").await.unwrap();
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn clear_resets_to_empty() {
        let (store, _) = store();
        let mut doc = PersistedDocument::new();
        doc.set_value("qualityChecklist", json!({ "activeScenario": 2 }));
        store.write(&doc).await;

        store.clear().await;
        assert!(store.load().await.is_empty());
    }
}
