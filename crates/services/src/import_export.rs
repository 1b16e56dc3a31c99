use std::path::Path;

use prosody_core::model::PersistedDocument;
use tracing::{info, warn};

use crate::error::ImportError;
use crate::persisted_store::PersistedStore;

/// Suggested file name for downloaded snapshots.
pub const EXPORT_FILE_NAME: &str = "tts-prosody-builder-data.json";

/// Whole-document snapshots for backup and transfer between machines.
///
/// Imports are all-or-nothing: the stored document is either replaced in full
/// or left untouched.
#[derive(Clone)]
pub struct ImportExport {
    store: PersistedStore,
}

impl ImportExport {
    #[must_use]
    pub fn new(store: PersistedStore) -> Self {
        Self { store }
    }

    /// The stored document as indented JSON.
    pub async fn export_data(&self) -> String {
        let document = self.store.load().await;
        document.to_json_pretty().unwrap_or_else(|err| {
            warn!(error = %err, "failed to encode export; exporting empty document");
            "{}".to_owned()
        })
    }

    /// Replaces the stored document with `text`, reporting success.
    pub async fn import_data(&self, text: &str) -> bool {
        match self.try_import(text).await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "import rejected; existing data kept");
                false
            }
        }
    }

    /// Like `import_data`, returning the imported document or the reason it
    /// was rejected.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Parse` for invalid JSON and
    /// `ImportError::Storage` if the write fails.
    pub async fn try_import(&self, text: &str) -> Result<PersistedDocument, ImportError> {
        let document = PersistedDocument::from_json_str(text)?;
        self.store.try_write(&document).await?;
        info!(sections = document.len(), "document imported");
        Ok(document)
    }

    /// Writes the export to `path`.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Io` if the file cannot be written.
    pub async fn export_file(&self, path: &Path) -> Result<(), ImportError> {
        let text = self.export_data().await;
        tokio::fs::write(path, text).await?;
        info!(path = %path.display(), "document exported");
        Ok(())
    }

    /// Imports the document stored in `path`.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the file cannot be read or parsed, or the
    /// write fails.
    pub async fn import_file(&self, path: &Path) -> Result<PersistedDocument, ImportError> {
        let text = tokio::fs::read_to_string(path).await?;
        self.try_import(&text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use storage::repository::{DocumentRepository, InMemoryRepository};

    fn transfer() -> (ImportExport, PersistedStore) {
        let repo: Arc<dyn DocumentRepository> = Arc::new(InMemoryRepository::new());
        let store = PersistedStore::with_default_key(repo);
        (ImportExport::new(store.clone()), store)
    }

    fn sample() -> PersistedDocument {
        let mut doc = PersistedDocument::new();
        doc.set_value(
            "appSettings",
            json!({ "activePhase": "structure", "lastUpdated": "2024-03-01T12:00:00Z" }),
        );
        doc.set_value(
            "qualityChecklist",
            json!({ "activeScenario": 1, "scenarios": [
                { "id": 1, "name": "Energy - Tariff", "domain": "energy", "status": "draft", "checks": {} }
            ] }),
        );
        doc.set_value("attentionChecks", json!({ "selected": ["c1", "c2"] }));
        doc
    }

    #[tokio::test]
    async fn export_then_import_reproduces_document() {
        let (transfer, store) = transfer();
        store.write(&sample()).await;

        let text = transfer.export_data().await;
        store.clear().await;
        assert!(transfer.import_data(&text).await);

        assert_eq!(store.load().await, sample());
        assert_eq!(transfer.export_data().await, text);
    }

    #[tokio::test]
    async fn invalid_json_leaves_data_untouched() {
        let (transfer, store) = transfer();
        store.write(&sample()).await;

        assert!(!transfer.import_data("{not valid json").await);
        assert_eq!(store.load().await, sample());
    }

    #[tokio::test]
    async fn non_object_import_succeeds_as_empty() {
        let (transfer, store) = transfer();
        store.write(&sample()).await;

        assert!(transfer.import_data("[]").await);
        assert!(store.load().await.is_empty());
        assert!(!transfer.import_data("").await);
    }
}
