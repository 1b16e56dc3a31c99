use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use prosody_core::model::{RemoteRecord, UserId};

use crate::error::RemoteError;

/// Table of remote records keyed by user id.
///
/// `fetch` distinguishes "no record yet" (`Ok(None)`) from a failed call.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Create the user's record, or replace it when it already exists.
    ///
    /// Implementations keep the existing `created_at` on replace.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the backend rejects or cannot serve the call.
    async fn upsert(&self, record: &RemoteRecord) -> Result<(), RemoteError>;

    /// Fetch the record for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the backend rejects or cannot serve the call.
    async fn fetch(&self, user_id: &UserId) -> Result<Option<RemoteRecord>, RemoteError>;
}

/// In-process backend for tests and offline development.
///
/// `set_available(false)` makes every call fail, simulating an outage.
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    records: Arc<Mutex<HashMap<UserId, RemoteRecord>>>,
    unavailable: Arc<Mutex<bool>>,
}

impl InMemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        if let Ok(mut guard) = self.unavailable.lock() {
            *guard = !available;
        }
    }

    /// Direct read for assertions, bypassing availability.
    #[must_use]
    pub fn record(&self, user_id: &UserId) -> Option<RemoteRecord> {
        self.records
            .lock()
            .ok()
            .and_then(|guard| guard.get(user_id).cloned())
    }

    /// Direct write for seeding, bypassing availability.
    pub fn insert(&self, record: RemoteRecord) {
        if let Ok(mut guard) = self.records.lock() {
            guard.insert(record.user_id.clone(), record);
        }
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        let unavailable = self
            .unavailable
            .lock()
            .map_err(|e| RemoteError::Backend(e.to_string()))?;
        if *unavailable {
            return Err(RemoteError::Backend("backend unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteBackend for InMemoryRemote {
    async fn upsert(&self, record: &RemoteRecord) -> Result<(), RemoteError> {
        self.check_available()?;
        let mut guard = self
            .records
            .lock()
            .map_err(|e| RemoteError::Backend(e.to_string()))?;
        let mut record = record.clone();
        if let Some(existing) = guard.get(&record.user_id) {
            record.created_at = existing.created_at;
        }
        guard.insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn fetch(&self, user_id: &UserId) -> Result<Option<RemoteRecord>, RemoteError> {
        self.check_available()?;
        let guard = self
            .records
            .lock()
            .map_err(|e| RemoteError::Backend(e.to_string()))?;
        Ok(guard.get(user_id).cloned())
    }
}
