mod app_settings;
mod document;
mod ids;
mod phase;
mod remote;
mod section;
pub mod sections;

pub use app_settings::AppSettings;
pub use document::{PersistedDocument, DEFAULT_STORAGE_KEY};
pub use ids::UserId;
pub use phase::{PhaseError, PhaseId};
pub use remote::RemoteRecord;
pub use section::{Section, SectionKind, Typed};
