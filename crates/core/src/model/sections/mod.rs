//! Typed payloads for the wizard sections the persistence layer understands.
//!
//! Each state keeps fields it does not model in `extra`, so a document written
//! by a newer build survives a load/save cycle untouched.

mod checklist;
mod numeric;
mod structure;

pub use checklist::{ChecklistScenario, QualityChecklistState};
pub use numeric::{EditableParams, NumericEquivalenceState};
pub use structure::{GeneratedScenario, SentenceStructureState};
