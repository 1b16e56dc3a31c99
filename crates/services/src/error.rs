//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors reported by a remote backend call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemoteError {
    #[error("remote request failed with status {status}: {message}")]
    HttpStatus {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("remote backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid remote URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors emitted by `CloudSyncEngine`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("cloud sync is not configured")]
    Disabled,
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),
    #[error(transparent)]
    Local(#[from] StorageError),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        SyncError::RemoteUnavailable(err.to_string())
    }
}

/// Errors emitted by `AuthClient`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("authentication failed with status {status}: {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("sign-up requires email confirmation before signing in")]
    ConfirmationRequired,
    #[error("identity provider returned no user")]
    MissingUser,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid remote URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors emitted while importing a document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("invalid document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid remote URL: {raw}")]
    InvalidUrl { raw: String },
    #[error("invalid autosave delay (ms): {raw}")]
    InvalidDelay { raw: String },
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
