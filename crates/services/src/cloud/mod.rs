//! Optional cloud copy of the document, keyed by the signed-in user.

mod auth;
mod auto_sync;
mod remote;
mod rest;
mod status;
mod sync;

pub use auth::{AuthClient, Session};
pub use auto_sync::AutoSync;
pub use remote::{InMemoryRemote, RemoteBackend};
pub use rest::{RestRemote, USER_DATA_TABLE};
pub use status::{SyncPhase, SyncState, SyncStatusTracker};
pub use sync::CloudSyncEngine;
