use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use prosody_core::time::format_timestamp;

/// Where the most recent sync attempt stands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Idle,
    Syncing,
    Success,
    Error(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncState {
    pub phase: SyncPhase,
    pub last_synced: Option<DateTime<Utc>>,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.phase, self.last_synced) {
            (SyncPhase::Syncing, _) => f.write_str("Syncing..."),
            (SyncPhase::Success, _) => f.write_str("Synced"),
            (SyncPhase::Error(message), _) => write!(f, "Sync failed: {message}"),
            (SyncPhase::Idle, Some(at)) => write!(f, "Last synced: {}", format_timestamp(at)),
            (SyncPhase::Idle, None) => f.write_str("Not synced"),
        }
    }
}

/// Shared status indicator updated by sync operations.
#[derive(Debug, Default)]
pub struct SyncStatusTracker {
    state: Mutex<SyncState>,
}

impl SyncStatusTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) {
        self.update(|state| state.phase = SyncPhase::Syncing);
    }

    pub fn succeed(&self, at: DateTime<Utc>) {
        self.update(|state| {
            state.phase = SyncPhase::Success;
            state.last_synced = Some(at);
        });
    }

    /// Marks the attempt failed; `last_synced` keeps the previous success.
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|state| state.phase = SyncPhase::Error(message));
    }

    /// Returns to idle, e.g. once a success or failure has been shown.
    pub fn reset(&self) {
        self.update(|state| state.phase = SyncPhase::Idle);
    }

    #[must_use]
    pub fn snapshot(&self) -> SyncState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, apply: impl FnOnce(&mut SyncState)) {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut guard);
    }
}
