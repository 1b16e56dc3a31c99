use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable key-value storage for serialized documents.
///
/// Values are opaque text; callers own the encoding. A missing key is
/// `Ok(None)`, never an error.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Fetch the text stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_blob(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn put_blob(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn delete_blob(&self, key: &str) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl DocumentRepository for InMemoryRepository {
    async fn get_blob(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .blobs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn put_blob(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .blobs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete_blob(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .blobs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Holds the document repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub documents: Arc<dyn DocumentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let documents: Arc<dyn DocumentRepository> = Arc::new(InMemoryRepository::new());
        Self { documents }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_replaces_and_deletes_blobs() {
        let repo = InMemoryRepository::new();
        assert_eq!(repo.get_blob("doc").await.unwrap(), None);

        repo.put_blob("doc", "{}").await.unwrap();
        repo.put_blob("doc", r#"{"a":1}"#).await.unwrap();
        assert_eq!(repo.get_blob("doc").await.unwrap().as_deref(), Some(r#"{"a":1}"#));

        repo.delete_blob("doc").await.unwrap();
        repo.delete_blob("doc").await.unwrap();
        assert_eq!(repo.get_blob("doc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let storage = Storage::in_memory();
        storage.documents.put_blob("a", "1").await.unwrap();
        storage.documents.put_blob("b", "2").await.unwrap();
        storage.documents.delete_blob("a").await.unwrap();
        assert_eq!(storage.documents.get_blob("b").await.unwrap().as_deref(), Some("2"));
    }
}
