use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::document::PersistedDocument;
use crate::model::ids::UserId;

/// The single row holding one user's synced document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub user_id: UserId,
    #[serde(default)]
    pub data: PersistedDocument,
    pub last_synced: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RemoteRecord {
    /// A record for a first push; all timestamps are `now`.
    #[must_use]
    pub fn new(user_id: UserId, data: PersistedDocument, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            data,
            last_synced: now,
            created_at: now,
            updated_at: now,
        }
    }
}
