use std::path::Path;
use std::sync::Arc;

use prosody_core::model::{AppSettings, PersistedDocument, PhaseId, SectionKind, UserId};
use serde_json::{Map, Value};
use storage::repository::Storage;
use tracing::{info, warn};

use crate::autosave::AutoSaveController;
use crate::cloud::{
    AuthClient, AutoSync, CloudSyncEngine, RemoteBackend, RestRemote, Session, SyncState,
    SyncStatusTracker,
};
use crate::config::AppConfig;
use crate::error::{AppServicesError, ImportError, SyncError};
use crate::import_export::ImportExport;
use crate::persisted_store::PersistedStore;
use crate::Clock;

/// Remote side, present only when cloud sync is configured.
#[derive(Clone)]
struct CloudServices {
    auth: Option<AuthClient>,
    rest: Option<Arc<RestRemote>>,
    engine: CloudSyncEngine,
    auto_sync: AutoSync,
}

/// Assembles the app-facing services around one stored document.
#[derive(Clone)]
pub struct AppServices {
    store: PersistedStore,
    autosave: AutoSaveController,
    import_export: ImportExport,
    status: Arc<SyncStatusTracker>,
    cloud: Option<CloudServices>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and, when configured, the
    /// REST backend.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        let rest = config
            .cloud
            .clone()
            .map(|cloud| Arc::new(RestRemote::new(cloud)));
        let remote = rest
            .clone()
            .map(|rest| rest as Arc<dyn RemoteBackend>);
        let mut services = Self::with_storage(storage, config, clock, remote).await;
        if let Some(cloud) = services.cloud.as_mut() {
            cloud.auth = config.cloud.clone().map(AuthClient::new);
            cloud.rest = rest;
        }
        Ok(services)
    }

    /// Build services over in-memory storage, with an optional remote.
    pub async fn in_memory(
        config: &AppConfig,
        clock: Clock,
        remote: Option<Arc<dyn RemoteBackend>>,
    ) -> Self {
        Self::with_storage(Storage::in_memory(), config, clock, remote).await
    }

    pub async fn with_storage(
        storage: Storage,
        config: &AppConfig,
        clock: Clock,
        remote: Option<Arc<dyn RemoteBackend>>,
    ) -> Self {
        let store = PersistedStore::new(storage.documents, config.storage_key.clone());
        let autosave =
            AutoSaveController::load(store.clone(), clock, config.autosave_delay).await;
        let import_export = ImportExport::new(store.clone());
        let status = Arc::new(SyncStatusTracker::new());
        let cloud = remote.map(|remote| {
            let engine =
                CloudSyncEngine::new(clock, store.clone(), remote, Arc::clone(&status));
            let auto_sync = AutoSync::new(engine.clone(), config.autosync_delay);
            CloudServices {
                auth: None,
                rest: None,
                engine,
                auto_sync,
            }
        });

        Self {
            store,
            autosave,
            import_export,
            status,
            cloud,
        }
    }

    #[must_use]
    pub fn store(&self) -> &PersistedStore {
        &self.store
    }

    #[must_use]
    pub fn autosave(&self) -> &AutoSaveController {
        &self.autosave
    }

    #[must_use]
    pub fn import_export(&self) -> &ImportExport {
        &self.import_export
    }

    #[must_use]
    pub fn cloud_enabled(&self) -> bool {
        self.cloud.is_some()
    }

    #[must_use]
    pub fn sync_engine(&self) -> Option<&CloudSyncEngine> {
        self.cloud.as_ref().map(|cloud| &cloud.engine)
    }

    #[must_use]
    pub fn auth(&self) -> Option<&AuthClient> {
        self.cloud.as_ref().and_then(|cloud| cloud.auth.as_ref())
    }

    #[must_use]
    pub fn sync_status(&self) -> SyncState {
        self.status.snapshot()
    }

    /// Authenticates remote calls as `session` and enables background pushes.
    pub fn begin_session(&self, session: &Session) {
        if let Some(cloud) = &self.cloud {
            if let Some(rest) = &cloud.rest {
                rest.set_access_token(Some(session.access_token.clone()));
            }
            cloud.auto_sync.set_user(Some(session.user_id.clone()));
        }
    }

    pub fn end_session(&self) {
        if let Some(cloud) = &self.cloud {
            if let Some(rest) = &cloud.rest {
                rest.set_access_token(None);
            }
            cloud.auto_sync.set_user(None);
        }
        self.status.reset();
    }

    /// Debounced save of one section, followed by a debounced push when a
    /// user is signed in.
    pub fn save_section(&self, section: &str, partial: Map<String, Value>) {
        self.autosave.save(section, partial);
        if let Some(cloud) = &self.cloud {
            cloud.auto_sync.notify_change();
        }
    }

    /// Records the wizard's current phase.
    pub fn set_phase(&self, phase: PhaseId) {
        let mut partial = Map::new();
        partial.insert("activePhase".into(), Value::from(phase.as_str()));
        self.save_section(SectionKind::AppSettings.as_str(), partial);
    }

    /// Phase stored in the in-memory document.
    #[must_use]
    pub fn phase(&self) -> PhaseId {
        self.autosave
            .document()
            .app_settings()
            .map(AppSettings::phase)
            .unwrap_or_default()
    }

    /// Writes pending edits now.
    pub async fn flush(&self) {
        self.autosave.flush().await;
    }

    /// Exports the document including edits not yet written.
    pub async fn export_data(&self) -> String {
        self.flush().await;
        self.import_export.export_data().await
    }

    /// Exports to `path`, flushing pending edits first.
    ///
    /// # Errors
    ///
    /// Returns `ImportError::Io` if the file cannot be written.
    pub async fn export_file(&self, path: &Path) -> Result<(), ImportError> {
        self.flush().await;
        self.import_export.export_file(path).await
    }

    /// Replaces all data with `text`; on failure nothing changes.
    pub async fn import_data(&self, text: &str) -> bool {
        self.flush().await;
        match self.import_export.try_import(text).await {
            Ok(document) => {
                self.adopt(document).await;
                true
            }
            Err(err) => {
                warn!(error = %err, "import rejected; existing data kept");
                false
            }
        }
    }

    /// Replaces all data with the document stored in `path`.
    ///
    /// # Errors
    ///
    /// Returns `ImportError` if the file cannot be read, parsed or stored.
    pub async fn import_file(&self, path: &Path) -> Result<PersistedDocument, ImportError> {
        self.flush().await;
        let document = self.import_export.import_file(path).await?;
        self.adopt(document.clone()).await;
        Ok(document)
    }

    /// Removes all local data.
    pub async fn clear(&self) {
        self.autosave.replace_document(PersistedDocument::new()).await;
        self.store.clear().await;
        info!("local data cleared");
    }

    /// Flushes pending edits, then runs a full sync for `user_id`.
    ///
    /// Whatever the outcome, the in-memory document is reloaded from storage
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Disabled` without a configured backend, otherwise
    /// whatever `CloudSyncEngine::full_sync` reports.
    pub async fn sync_now(&self, user_id: &UserId) -> Result<PersistedDocument, SyncError> {
        let cloud = self.cloud.as_ref().ok_or(SyncError::Disabled)?;
        self.flush().await;
        let result = cloud.engine.full_sync(user_id).await;
        let current = match &result {
            Ok(merged) => merged.clone(),
            Err(_) => self.store.load().await,
        };
        self.autosave.replace_document(current).await;
        result
    }

    async fn adopt(&self, document: PersistedDocument) {
        self.autosave.replace_document(document).await;
        if let Some(cloud) = &self.cloud {
            cloud.auto_sync.notify_change();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prosody_core::time::fixed_clock;

    #[tokio::test(start_paused = true)]
    async fn phase_round_trips_through_storage() {
        let services = AppServices::in_memory(&AppConfig::default(), fixed_clock(), None).await;
        assert_eq!(services.phase(), PhaseId::Home);

        services.set_phase(PhaseId::Prosody);
        services.flush().await;

        let stored = services.store().load().await;
        assert_eq!(
            stored.app_settings().map(|settings| settings.phase()),
            Some(PhaseId::Prosody)
        );
    }

    #[tokio::test]
    async fn sync_without_backend_is_disabled() {
        let services = AppServices::in_memory(&AppConfig::default(), fixed_clock(), None).await;
        let user = UserId::new("u1").unwrap();
        assert!(matches!(
            services.sync_now(&user).await,
            Err(SyncError::Disabled)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn clear_resets_memory_and_storage() {
        let services = AppServices::in_memory(&AppConfig::default(), fixed_clock(), None).await;
        services.set_phase(PhaseId::Checks);
        services.clear().await;

        assert!(services.autosave().document().is_empty());
        assert!(services.store().load().await.is_empty());
        assert!(services.autosave().pending_sections().is_empty());
    }
}
