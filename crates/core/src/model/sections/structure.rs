use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::text::{self, TextComparison};

/// An option pair produced from a sentence template.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedScenario {
    #[serde(default)]
    pub domain: String,
    #[serde(rename = "optionA", default)]
    pub option_a: String,
    #[serde(rename = "optionB", default)]
    pub option_b: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GeneratedScenario {
    #[must_use]
    pub fn balance(&self) -> TextComparison {
        text::compare_texts(&self.option_a, &self.option_b)
    }
}

/// The `sentenceStructure` section.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceStructureState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_scenarios: Option<Vec<GeneratedScenario>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_inputs: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SentenceStructureState {
    #[must_use]
    pub fn scenarios(&self) -> &[GeneratedScenario] {
        self.generated_scenarios.as_deref().unwrap_or_default()
    }
}
