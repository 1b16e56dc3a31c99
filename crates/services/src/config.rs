use std::env;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use prosody_core::model::DEFAULT_STORAGE_KEY;

pub const ENV_REMOTE_URL: &str = "PROSODY_SUPABASE_URL";
pub const ENV_REMOTE_KEY: &str = "PROSODY_SUPABASE_ANON_KEY";
pub const ENV_DB_URL: &str = "PROSODY_DB_URL";
pub const ENV_STORAGE_KEY: &str = "PROSODY_STORAGE_KEY";
pub const ENV_AUTOSAVE_MS: &str = "PROSODY_AUTOSAVE_MS";

pub const DEFAULT_DB_URL: &str = "sqlite://prosody.sqlite3";
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_AUTOSYNC_DELAY: Duration = Duration::from_secs(3);

/// Remote backend endpoint and public API key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloudConfig {
    pub url: String,
    pub anon_key: String,
}

impl CloudConfig {
    /// Builds a config from raw values.
    ///
    /// Returns `Ok(None)` when either value is blank: cloud sync then stays
    /// inert and the app runs local-only.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the URL is present but malformed.
    pub fn new(url: &str, anon_key: &str) -> Result<Option<Self>, ConfigError> {
        let url = url.trim();
        let anon_key = anon_key.trim();
        if url.is_empty() || anon_key.is_empty() {
            return Ok(None);
        }
        if Url::parse(url).is_err() {
            return Err(ConfigError::InvalidUrl {
                raw: url.to_owned(),
            });
        }
        Ok(Some(Self {
            url: url.trim_end_matches('/').to_owned(),
            anon_key: anon_key.to_owned(),
        }))
    }

    /// Reads `PROSODY_SUPABASE_URL` and `PROSODY_SUPABASE_ANON_KEY`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is malformed.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let url = env::var(ENV_REMOTE_URL).unwrap_or_default();
        let key = env::var(ENV_REMOTE_KEY).unwrap_or_default();
        Self::new(&url, &key)
    }
}

/// Everything the app needs to assemble its services.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db_url: String,
    pub storage_key: String,
    pub autosave_delay: Duration,
    pub autosync_delay: Duration,
    pub cloud: Option<CloudConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_url: DEFAULT_DB_URL.to_owned(),
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            autosave_delay: DEFAULT_AUTOSAVE_DELAY,
            autosync_delay: DEFAULT_AUTOSYNC_DELAY,
            cloud: None,
        }
    }
}

impl AppConfig {
    /// Reads the environment, falling back to defaults for unset values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a malformed remote URL or autosave delay.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(db_url) = non_blank(env::var(ENV_DB_URL).ok()) {
            config.db_url = db_url;
        }
        if let Some(key) = non_blank(env::var(ENV_STORAGE_KEY).ok()) {
            config.storage_key = key;
        }
        if let Some(raw) = non_blank(env::var(ENV_AUTOSAVE_MS).ok()) {
            config.autosave_delay = parse_delay_ms(&raw)?;
        }
        config.cloud = CloudConfig::from_env()?;
        Ok(config)
    }

    #[must_use]
    pub fn cloud_enabled(&self) -> bool {
        self.cloud.is_some()
    }
}

/// Parses a delay given in whole milliseconds.
///
/// # Errors
///
/// Returns `ConfigError::InvalidDelay` for non-numeric input.
pub fn parse_delay_ms(raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidDelay {
            raw: raw.to_owned(),
        })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
