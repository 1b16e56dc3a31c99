#![forbid(unsafe_code)]

pub mod app_services;
pub mod autosave;
pub mod cloud;
pub mod config;
pub mod error;
pub mod import_export;
pub mod persisted_store;

pub use prosody_core::Clock;

pub use app_services::AppServices;
pub use autosave::{AutoSaveController, SectionSaver};
pub use cloud::{
    AuthClient, AutoSync, CloudSyncEngine, InMemoryRemote, RemoteBackend, RestRemote, Session,
    SyncPhase, SyncState, SyncStatusTracker,
};
pub use config::{AppConfig, CloudConfig};
pub use error::{AppServicesError, AuthError, ConfigError, ImportError, RemoteError, SyncError};
pub use import_export::ImportExport;
pub use persisted_store::PersistedStore;
