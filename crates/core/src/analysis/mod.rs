//! Closed-form calculators backing the wizard's validation panels.
//!
//! Every calculation here is an explicit function of its inputs; nothing is
//! evaluated from user-editable formula strings.

pub mod checklist;
pub mod equivalence;
pub mod text;

pub use checklist::{CheckDefinition, ChecklistStatus, ChecksByCategory};
pub use equivalence::{
    CalcError, EquivalenceAnalysis, EquivalenceStatus, OptionSide, ScenarioDomain,
};
pub use text::{TextComparison, TextStats};
