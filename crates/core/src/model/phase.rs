use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PhaseError {
    #[error("unknown phase: {0}")]
    Unknown(String),
}

/// A step of the authoring wizard, in navigation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhaseId {
    #[default]
    Home,
    TextReview,
    Numeric,
    Structure,
    Prosody,
    Checks,
    Fillers,
    Quality,
    Documentation,
}

impl PhaseId {
    pub const ORDER: [PhaseId; 9] = [
        PhaseId::Home,
        PhaseId::TextReview,
        PhaseId::Numeric,
        PhaseId::Structure,
        PhaseId::Prosody,
        PhaseId::Checks,
        PhaseId::Fillers,
        PhaseId::Quality,
        PhaseId::Documentation,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseId::Home => "home",
            PhaseId::TextReview => "text-review",
            PhaseId::Numeric => "numeric",
            PhaseId::Structure => "structure",
            PhaseId::Prosody => "prosody",
            PhaseId::Checks => "checks",
            PhaseId::Fillers => "fillers",
            PhaseId::Quality => "quality",
            PhaseId::Documentation => "documentation",
        }
    }

    /// Human-readable name shown in navigation.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            PhaseId::Home => "Project Overview",
            PhaseId::TextReview => "Text Review & Refinement",
            PhaseId::Numeric => "Numeric Equivalence",
            PhaseId::Structure => "Sentence Structure",
            PhaseId::Prosody => "Prosody Annotation",
            PhaseId::Checks => "Attention Checks",
            PhaseId::Fillers => "Filler Prompts",
            PhaseId::Quality => "Quality Checklist",
            PhaseId::Documentation => "Documentation",
        }
    }

    fn position(self) -> usize {
        Self::ORDER
            .iter()
            .position(|phase| *phase == self)
            .unwrap_or_default()
    }

    /// The phase after this one, or `None` at the end of the wizard.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::ORDER.get(self.position() + 1).copied()
    }

    /// The phase before this one, or `None` on the overview.
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        self.position()
            .checked_sub(1)
            .and_then(|idx| Self::ORDER.get(idx).copied())
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseId {
    type Err = PhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ORDER
            .iter()
            .copied()
            .find(|phase| phase.as_str() == needle)
            .ok_or_else(|| PhaseError::Unknown(needle.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_follows_wizard_order() {
        assert_eq!(PhaseId::Home.previous(), None);
        assert_eq!(PhaseId::Home.next(), Some(PhaseId::TextReview));
        assert_eq!(PhaseId::Quality.next(), Some(PhaseId::Documentation));
        assert_eq!(PhaseId::Documentation.next(), None);
        assert_eq!(PhaseId::Numeric.previous(), Some(PhaseId::TextReview));
    }

    #[test]
    fn parses_kebab_case_ids() {
        assert_eq!("text-review".parse::<PhaseId>(), Ok(PhaseId::TextReview));
        assert_eq!(
            "numeric-calc".parse::<PhaseId>(),
            Err(PhaseError::Unknown("numeric-calc".into()))
        );
    }
}
