use std::fmt;
use std::ops::Deref;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::model::app_settings::AppSettings;
use crate::model::sections::{NumericEquivalenceState, QualityChecklistState, SentenceStructureState};

/// Section names written by the authoring wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SectionKind {
    AppSettings,
    ScenarioRefinement,
    NumericEquivalence,
    SentenceStructure,
    ProsodyAnnotation,
    AttentionChecks,
    FillerPrompts,
    QualityChecklist,
}

impl SectionKind {
    pub const ALL: [SectionKind; 8] = [
        SectionKind::AppSettings,
        SectionKind::ScenarioRefinement,
        SectionKind::NumericEquivalence,
        SectionKind::SentenceStructure,
        SectionKind::ProsodyAnnotation,
        SectionKind::AttentionChecks,
        SectionKind::FillerPrompts,
        SectionKind::QualityChecklist,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::AppSettings => "appSettings",
            SectionKind::ScenarioRefinement => "scenarioRefinement",
            SectionKind::NumericEquivalence => "numericEquivalence",
            SectionKind::SentenceStructure => "sentenceStructure",
            SectionKind::ProsodyAnnotation => "prosodyAnnotation",
            SectionKind::AttentionChecks => "attentionChecks",
            SectionKind::FillerPrompts => "fillerPrompts",
            SectionKind::QualityChecklist => "qualityChecklist",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded section paired with the JSON it was decoded from.
///
/// The JSON is what gets persisted, so values the typed view normalizes
/// (integer-valued numbers, explicit nulls, timestamp precision) are written
/// back exactly as they were read.
#[derive(Clone, Debug, PartialEq)]
pub struct Typed<T> {
    state: T,
    raw: Value,
}

impl<T> Typed<T> {
    #[must_use]
    pub fn state(&self) -> &T {
        &self.state
    }

    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

impl<T> Deref for Typed<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.state
    }
}

/// One section payload.
///
/// Known sections decode into their typed state. Unknown section names, and
/// payloads that do not fit the typed shape, are kept as `Opaque`. Either way
/// the section serializes as its stored JSON.
#[derive(Clone, Debug, PartialEq)]
pub enum Section {
    AppSettings(Typed<AppSettings>),
    NumericEquivalence(Typed<NumericEquivalenceState>),
    SentenceStructure(Typed<SentenceStructureState>),
    QualityChecklist(Typed<QualityChecklistState>),
    Opaque(Value),
}

impl Section {
    /// Decodes `value` according to the section it is stored under.
    #[must_use]
    pub fn decode(name: &str, value: Value) -> Self {
        fn typed<T: DeserializeOwned>(value: Value, wrap: fn(Typed<T>) -> Section) -> Section {
            match T::deserialize(&value) {
                Ok(state) => wrap(Typed { state, raw: value }),
                Err(_) => Section::Opaque(value),
            }
        }

        match SectionKind::from_name(name) {
            Some(SectionKind::AppSettings) => typed(value, Section::AppSettings),
            Some(SectionKind::NumericEquivalence) => typed(value, Section::NumericEquivalence),
            Some(SectionKind::SentenceStructure) => typed(value, Section::SentenceStructure),
            Some(SectionKind::QualityChecklist) => typed(value, Section::QualityChecklist),
            _ => Section::Opaque(value),
        }
    }

    /// The stored JSON.
    #[must_use]
    pub fn raw(&self) -> &Value {
        match self {
            Section::AppSettings(typed) => typed.raw(),
            Section::NumericEquivalence(typed) => typed.raw(),
            Section::SentenceStructure(typed) => typed.raw(),
            Section::QualityChecklist(typed) => typed.raw(),
            Section::Opaque(value) => value,
        }
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        self.raw().clone()
    }

    /// Shallow-merges `partial` into this section and re-decodes it as `name`.
    ///
    /// A section that is not a JSON object is replaced by `partial`.
    pub fn merge_partial(&mut self, name: &str, partial: Map<String, Value>) {
        let mut fields = match self.to_value() {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.extend(partial);
        *self = Section::decode(name, Value::Object(fields));
    }

    #[must_use]
    pub fn is_opaque(&self) -> bool {
        matches!(self, Section::Opaque(_))
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw().serialize(serializer)
    }
}
