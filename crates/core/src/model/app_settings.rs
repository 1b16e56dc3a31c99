use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::phase::PhaseId;

/// The `appSettings` section: wizard position plus the document-wide change stamp.
///
/// `last_updated` is the only timestamp consulted when reconciling a local
/// document with its remote copy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppSettings {
    /// The active phase, falling back to the overview for unknown or missing ids.
    #[must_use]
    pub fn phase(&self) -> PhaseId {
        self.active_phase
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default()
    }
}
