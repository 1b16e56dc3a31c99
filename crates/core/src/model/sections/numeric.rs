use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::analysis::equivalence::{self, CalcError, EquivalenceAnalysis, OptionSide, ScenarioDomain};

/// In-progress parameter edits for the active scenario.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EditableParams {
    #[serde(rename = "optionA", default, skip_serializing_if = "Option::is_none")]
    pub option_a: Option<BTreeMap<String, f64>>,
    #[serde(rename = "optionB", default, skip_serializing_if = "Option::is_none")]
    pub option_b: Option<BTreeMap<String, f64>>,
}

impl EditableParams {
    fn side(&self, side: OptionSide) -> Option<&BTreeMap<String, f64>> {
        match side {
            OptionSide::A => self.option_a.as_ref(),
            OptionSide::B => self.option_b.as_ref(),
        }
    }
}

/// The `numericEquivalence` section.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericEquivalenceState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_scenario: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable_params: Option<EditableParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_editing: Option<bool>,
    /// Saved scenario definitions, including any committed parameter edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenarios_data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NumericEquivalenceState {
    /// The selected domain, defaulting to banking.
    ///
    /// # Errors
    ///
    /// Returns `CalcError::UnknownDomain` for an unrecognized saved id.
    pub fn domain(&self) -> Result<ScenarioDomain, CalcError> {
        self.active_scenario
            .as_deref()
            .map_or(Ok(ScenarioDomain::Banking), str::parse)
    }

    /// Effective parameters: defaults, then saved scenario data, then pending edits.
    #[must_use]
    pub fn params_for(&self, domain: ScenarioDomain, side: OptionSide) -> BTreeMap<String, f64> {
        let mut params = domain.default_params(side);

        let key = match side {
            OptionSide::A => "optionA",
            OptionSide::B => "optionB",
        };
        if let Some(Value::Object(saved)) = self
            .scenarios_data
            .as_ref()
            .and_then(|data| data.get(domain.as_str()))
            .and_then(|scenario| scenario.get(key))
            .and_then(|option| option.get("params"))
        {
            for (name, value) in saved {
                if let Some(number) = value.as_f64() {
                    params.insert(name.clone(), number);
                }
            }
        }

        if self.is_editing == Some(true) && self.active_scenario.as_deref() == Some(domain.as_str()) {
            if let Some(edits) = self.editable_params.as_ref().and_then(|e| e.side(side)) {
                params.extend(edits.iter().map(|(k, v)| (k.clone(), *v)));
            }
        }

        params
    }

    /// Runs the equivalence check for `domain` with the effective parameters.
    ///
    /// # Errors
    ///
    /// Returns `CalcError` if either option cannot be evaluated.
    pub fn analyze(&self, domain: ScenarioDomain) -> Result<EquivalenceAnalysis, CalcError> {
        equivalence::analyze_domain(
            domain,
            &self.params_for(domain, OptionSide::A),
            &self.params_for(domain, OptionSide::B),
        )
    }
}
