use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::model::app_settings::AppSettings;
use crate::model::section::{Section, SectionKind};
use crate::model::sections::{NumericEquivalenceState, QualityChecklistState, SentenceStructureState};
use crate::time::{epoch, format_timestamp, parse_timestamp};

/// Storage key the whole document lives under.
pub const DEFAULT_STORAGE_KEY: &str = "tts-prosody-builder-data";

/// The complete persisted state: section name to section payload.
///
/// A missing section means "not yet initialized". Serializes as a JSON object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PersistedDocument {
    sections: BTreeMap<String, Section>,
}

impl PersistedDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a document from raw JSON sections, decoding each by name.
    #[must_use]
    pub fn from_map(raw: Map<String, Value>) -> Self {
        let sections = raw
            .into_iter()
            .map(|(name, value)| {
                let section = Section::decode(&name, value);
                (name, section)
            })
            .collect();
        Self { sections }
    }

    /// Parses serialized document text.
    ///
    /// Valid JSON that is not an object (`[]`, `null`, `42`) yields an empty
    /// document.
    ///
    /// # Errors
    ///
    /// Returns the parser error when `text` is not valid JSON.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(raw) => Ok(Self::from_map(raw)),
            _ => Ok(Self::new()),
        }
    }

    /// Compact serialized form, as written to storage and the remote record.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if a section cannot be encoded.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Indented serialized form, as offered for download.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if a section cannot be encoded.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    #[must_use]
    pub fn get_kind(&self, kind: SectionKind) -> Option<&Section> {
        self.get(kind.as_str())
    }

    pub fn insert(&mut self, name: impl Into<String>, section: Section) {
        self.sections.insert(name.into(), section);
    }

    /// Stores a raw JSON payload, decoding it by section name.
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let section = Section::decode(&name, value);
        self.sections.insert(name, section);
    }

    pub fn remove(&mut self, name: &str) -> Option<Section> {
        self.sections.remove(name)
    }

    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Merges `partial` into the named section, creating it when absent.
    pub fn merge_section(&mut self, name: &str, partial: Map<String, Value>) {
        match self.sections.get_mut(name) {
            Some(section) => section.merge_partial(name, partial),
            None => self.set_value(name, Value::Object(partial)),
        }
    }

    #[must_use]
    pub fn app_settings(&self) -> Option<&AppSettings> {
        match self.get_kind(SectionKind::AppSettings) {
            Some(Section::AppSettings(settings)) => Some(settings.state()),
            _ => None,
        }
    }

    #[must_use]
    pub fn numeric_equivalence(&self) -> Option<&NumericEquivalenceState> {
        match self.get_kind(SectionKind::NumericEquivalence) {
            Some(Section::NumericEquivalence(state)) => Some(state.state()),
            _ => None,
        }
    }

    #[must_use]
    pub fn sentence_structure(&self) -> Option<&SentenceStructureState> {
        match self.get_kind(SectionKind::SentenceStructure) {
            Some(Section::SentenceStructure(state)) => Some(state.state()),
            _ => None,
        }
    }

    #[must_use]
    pub fn quality_checklist(&self) -> Option<&QualityChecklistState> {
        match self.get_kind(SectionKind::QualityChecklist) {
            Some(Section::QualityChecklist(state)) => Some(state.state()),
            _ => None,
        }
    }

    /// The document's merge timestamp, or the epoch when none is recorded.
    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        match self.get_kind(SectionKind::AppSettings) {
            Some(Section::AppSettings(settings)) => settings.last_updated.unwrap_or_else(epoch),
            Some(Section::Opaque(raw)) => raw
                .get("lastUpdated")
                .and_then(Value::as_str)
                .and_then(parse_timestamp)
                .unwrap_or_else(epoch),
            _ => epoch(),
        }
    }

    /// Stamps `appSettings.lastUpdated`, creating the section if needed.
    ///
    /// The stamp is written the way browsers print `Date#toISOString`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        let mut stamp = Map::new();
        stamp.insert("lastUpdated".into(), Value::String(format_timestamp(now)));
        self.merge_section(SectionKind::AppSettings.as_str(), stamp);
    }
}

impl Serialize for PersistedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.sections.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PersistedDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(raw) => Ok(Self::from_map(raw)),
            _ => Ok(Self::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::phase::PhaseId;
    use serde_json::json;

    #[test]
    fn typed_accessors_skip_opaque_payloads() {
        let mut doc = PersistedDocument::new();
        doc.set_value("numericEquivalence", json!({ "activeScenario": "energy" }));
        doc.set_value("qualityChecklist", json!({ "scenarios": "not a list" }));

        let numeric = doc.numeric_equivalence().unwrap();
        assert_eq!(numeric.active_scenario.as_deref(), Some("energy"));
        assert!(doc.quality_checklist().is_none());
        assert!(doc.sentence_structure().is_none());
    }

    #[test]
    fn non_object_json_is_an_empty_document() {
        for text in ["[]", "null", "42", "\"text\""] {
            assert!(PersistedDocument::from_json_str(text).unwrap().is_empty(), "{text}");
        }
        assert!(PersistedDocument::from_json_str("{not valid json").is_err());
    }

    #[test]
    fn serialization_round_trips_typed_and_opaque_sections() {
        let text = json!({
            "appSettings": { "activePhase": "quality", "lastUpdated": "2024-01-01T00:00:00Z" },
            "prosodyAnnotation": { "selectedPreset": "warm", "custom": [1, 2] },
            "someFutureSection": true
        })
        .to_string();

        let doc = PersistedDocument::from_json_str(&text).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.app_settings().unwrap().phase(), PhaseId::Quality);

        let again = PersistedDocument::from_json_str(&doc.to_json_pretty().unwrap()).unwrap();
        assert_eq!(again, doc);
        assert_eq!(again.get("someFutureSection").unwrap().to_value(), json!(true));
    }

    #[test]
    fn browser_written_document_exports_unchanged() {
        let text = r#"{"appSettings":{"activePhase":"numeric","lastUpdated":"2024-01-01T00:00:00.000Z"},"numericEquivalence":{"activeScenario":"banking","editableParams":{"optionA":{"annualFee":49}},"isEditing":null}}"#;
        let doc = PersistedDocument::from_json_str(text).unwrap();
        assert!(doc.numeric_equivalence().is_some());
        assert_eq!(doc.to_json_string().unwrap(), text);
    }

    #[test]
    fn touch_writes_millisecond_stamp() {
        let mut doc = PersistedDocument::new();
        doc.set_value("appSettings", json!({ "activePhase": "checks", "theme": null }));
        doc.touch(crate::time::fixed_now());
        assert_eq!(
            doc.get("appSettings").unwrap().to_value(),
            json!({ "activePhase": "checks", "theme": null, "lastUpdated": "2023-11-14T22:13:20.000Z" })
        );
        assert_eq!(doc.app_settings().unwrap().phase(), PhaseId::Checks);
    }

    #[test]
    fn missing_or_unparsable_timestamp_reads_as_epoch() {
        assert_eq!(PersistedDocument::new().last_updated(), epoch());

        let mut doc = PersistedDocument::new();
        doc.set_value("appSettings", json!({ "lastUpdated": "yesterday" }));
        assert!(doc.get("appSettings").unwrap().is_opaque());
        assert_eq!(doc.last_updated(), epoch());
    }

    #[test]
    fn touch_creates_or_updates_app_settings() {
        let now = crate::time::fixed_now();
        let mut doc = PersistedDocument::new();
        doc.touch(now);
        assert_eq!(doc.last_updated(), now);

        let mut doc = PersistedDocument::new();
        doc.set_value("appSettings", json!({ "lastUpdated": "yesterday", "activePhase": 3 }));
        doc.touch(now);
        assert_eq!(doc.last_updated(), now);
        assert_eq!(doc.get("appSettings").unwrap().to_value()["activePhase"], json!(3));
    }

    #[test]
    fn merge_section_creates_missing_sections() {
        let mut doc = PersistedDocument::new();
        let partial = json!({ "activeTemplate": "energy" }).as_object().cloned().unwrap();
        doc.merge_section("sentenceStructure", partial);
        assert!(matches!(
            doc.get("sentenceStructure"),
            Some(Section::SentenceStructure(state)) if state.active_template.as_deref() == Some("energy")
        ));
    }
}
