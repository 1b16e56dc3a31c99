use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::checklist::{self, ChecklistStatus, ChecksByCategory};

/// One scenario's row in the quality checklist.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChecklistScenario {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub checks: ChecksByCategory,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChecklistScenario {
    #[must_use]
    pub fn progress(&self) -> u8 {
        checklist::progress(&self.checks)
    }

    /// Records a verdict and recomputes the scenario status.
    pub fn record(&mut self, category: &str, check_id: &str, verdict: &str) {
        self.checks
            .entry(category.to_owned())
            .or_default()
            .insert(check_id.to_owned(), verdict.to_owned());
        self.status = checklist::derive_status(&self.checks).as_str().to_owned();
    }

    #[must_use]
    pub fn derived_status(&self) -> ChecklistStatus {
        if self.checks.is_empty() {
            return ChecklistStatus::Draft;
        }
        checklist::derive_status(&self.checks)
    }
}

/// The `qualityChecklist` section.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityChecklistState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<ChecklistScenario>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_scenario: Option<usize>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QualityChecklistState {
    #[must_use]
    pub fn scenarios(&self) -> &[ChecklistScenario] {
        self.scenarios.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recording_a_verdict_updates_status() {
        let mut state: QualityChecklistState = serde_json::from_value(json!({
            "activeScenario": 0,
            "scenarios": [
                { "id": 1, "name": "Banking - Credit Card", "domain": "banking", "status": "draft", "checks": {} }
            ]
        }))
        .unwrap();

        let scenario = &mut state.scenarios.as_mut().unwrap()[0];
        assert_eq!(scenario.derived_status(), ChecklistStatus::Draft);
        scenario.record("textBalance", "tb1", "pass");
        assert_eq!(scenario.status, "in-progress");
        assert_eq!(scenario.progress(), 3);
    }
}
