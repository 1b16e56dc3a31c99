use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum percentage gap at which two options count as rationally equivalent.
pub const EQUIVALENT_PERCENT: f64 = 5.0;
/// Gap still tolerated for piloting, though flagged.
pub const ACCEPTABLE_PERCENT: f64 = 10.0;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CalcError {
    #[error("unknown scenario domain: {0}")]
    UnknownDomain(String),
    #[error("{domain} option {side} is missing parameter `{name}`")]
    MissingParam {
        domain: ScenarioDomain,
        side: OptionSide,
        name: &'static str,
    },
    #[error("{domain} option {side} did not produce a finite value")]
    NonFinite {
        domain: ScenarioDomain,
        side: OptionSide,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    A,
    B,
}

impl fmt::Display for OptionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionSide::A => f.write_str("A"),
            OptionSide::B => f.write_str("B"),
        }
    }
}

/// The decision scenarios the stimuli are built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioDomain {
    Banking,
    Insurance,
    Mobile,
    Energy,
    Subscription,
}

impl ScenarioDomain {
    pub const ALL: [ScenarioDomain; 5] = [
        ScenarioDomain::Banking,
        ScenarioDomain::Insurance,
        ScenarioDomain::Mobile,
        ScenarioDomain::Energy,
        ScenarioDomain::Subscription,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioDomain::Banking => "banking",
            ScenarioDomain::Insurance => "insurance",
            ScenarioDomain::Mobile => "mobile",
            ScenarioDomain::Energy => "energy",
            ScenarioDomain::Subscription => "subscription",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            ScenarioDomain::Banking => "Credit Card Selection",
            ScenarioDomain::Insurance => "Health Insurance Plan",
            ScenarioDomain::Mobile => "Mobile Data Plan",
            ScenarioDomain::Energy => "Energy Tariff",
            ScenarioDomain::Subscription => "Subscription Retention",
        }
    }

    /// Parameter names the cost function for `side` reads.
    #[must_use]
    pub fn param_names(self, side: OptionSide) -> &'static [&'static str] {
        match (self, side) {
            (ScenarioDomain::Banking, _) => &["annualFee", "cashbackRate", "avgSpending"],
            (ScenarioDomain::Insurance, _) => &["monthlyPremium", "deductible", "utilizationRate"],
            (ScenarioDomain::Mobile, _) => &["monthlyCost", "dataGB"],
            (ScenarioDomain::Energy, OptionSide::A) => &["ratePerKWh", "usageKWh", "monthlyFee"],
            (ScenarioDomain::Energy, OptionSide::B) => {
                &["avgRatePerKWh", "usageKWh", "monthlyFee"]
            }
            (ScenarioDomain::Subscription, OptionSide::A) => &["monthlyCost", "months"],
            (ScenarioDomain::Subscription, OptionSide::B) => {
                &["monthlyCost", "months", "contentLoss"]
            }
        }
    }

    /// Baseline parameters for a freshly opened scenario.
    #[must_use]
    pub fn default_params(self, side: OptionSide) -> BTreeMap<String, f64> {
        let pairs: &[(&str, f64)] = match (self, side) {
            (ScenarioDomain::Banking, OptionSide::A) => {
                &[("annualFee", 49.0), ("cashbackRate", 1.0), ("avgSpending", 3000.0)]
            }
            (ScenarioDomain::Banking, OptionSide::B) => {
                &[("annualFee", 0.0), ("cashbackRate", 0.6), ("avgSpending", 3000.0)]
            }
            (ScenarioDomain::Insurance, OptionSide::A) => &[
                ("monthlyPremium", 35.0),
                ("deductible", 350.0),
                ("utilizationRate", 0.7),
            ],
            (ScenarioDomain::Insurance, OptionSide::B) => &[
                ("monthlyPremium", 20.0),
                ("deductible", 500.0),
                ("utilizationRate", 0.7),
            ],
            (ScenarioDomain::Mobile, OptionSide::A) => {
                &[("dataGB", 40.0), ("monthlyCost", 15.0), ("extra5GPlus", 3.0)]
            }
            (ScenarioDomain::Mobile, OptionSide::B) => {
                &[("dataGB", 60.0), ("monthlyCost", 18.0), ("extra5GPlus", 0.0)]
            }
            (ScenarioDomain::Energy, OptionSide::A) => {
                &[("ratePerKWh", 0.27), ("monthlyFee", 5.0), ("usageKWh", 300.0)]
            }
            (ScenarioDomain::Energy, OptionSide::B) => &[
                ("avgRatePerKWh", 0.27),
                ("monthlyFee", 0.0),
                ("usageKWh", 300.0),
                ("volatility", 0.02),
            ],
            (ScenarioDomain::Subscription, OptionSide::A) => {
                &[("monthlyCost", 8.99), ("months", 6.0), ("contentValue", 20.0)]
            }
            (ScenarioDomain::Subscription, OptionSide::B) => {
                &[("monthlyCost", 0.0), ("months", 6.0), ("contentLoss", 20.0)]
            }
        };
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_owned(), *value))
            .collect()
    }

    /// Computes the comparable cost of one option, rounded to cents.
    ///
    /// # Errors
    ///
    /// Returns `CalcError` when a parameter is missing or the result is not finite
    /// (for example a mobile plan with `dataGB = 0`).
    pub fn evaluate(self, side: OptionSide, params: &BTreeMap<String, f64>) -> Result<f64, CalcError> {
        let get = |name: &'static str| {
            params.get(name).copied().ok_or(CalcError::MissingParam {
                domain: self,
                side,
                name,
            })
        };

        let raw = match (self, side) {
            (ScenarioDomain::Banking, _) => {
                get("annualFee")? - get("avgSpending")? * get("cashbackRate")? / 100.0
            }
            (ScenarioDomain::Insurance, _) => {
                get("monthlyPremium")? * 12.0 + get("deductible")? * get("utilizationRate")?
            }
            (ScenarioDomain::Mobile, _) => get("monthlyCost")? / get("dataGB")?,
            (ScenarioDomain::Energy, OptionSide::A) => {
                get("ratePerKWh")? * get("usageKWh")? + get("monthlyFee")?
            }
            (ScenarioDomain::Energy, OptionSide::B) => {
                get("avgRatePerKWh")? * get("usageKWh")? + get("monthlyFee")?
            }
            (ScenarioDomain::Subscription, OptionSide::A) => get("monthlyCost")? * get("months")?,
            (ScenarioDomain::Subscription, OptionSide::B) => {
                get("monthlyCost")? * get("months")? + get("contentLoss")?
            }
        };

        if !raw.is_finite() {
            return Err(CalcError::NonFinite { domain: self, side });
        }
        Ok(round_cents(raw))
    }
}

impl fmt::Display for ScenarioDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioDomain {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|domain| domain.as_str() == needle)
            .ok_or_else(|| CalcError::UnknownDomain(needle.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquivalenceStatus {
    Balanced,
    Acceptable,
    Unbalanced,
}

impl EquivalenceStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EquivalenceStatus::Balanced => "balanced",
            EquivalenceStatus::Acceptable => "acceptable",
            EquivalenceStatus::Unbalanced => "unbalanced",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceAnalysis {
    pub value_a: f64,
    pub value_b: f64,
    pub difference: f64,
    pub percent_diff: f64,
    pub is_equivalent: bool,
    pub higher_option: OptionSide,
    pub lower_option: OptionSide,
    pub status: EquivalenceStatus,
}

/// Compares two option values.
///
/// The gap is expressed relative to the larger value. When neither value is
/// positive the larger magnitude is used instead; two zeros are equivalent.
#[must_use]
pub fn analyze_equivalence(value_a: f64, value_b: f64) -> EquivalenceAnalysis {
    let difference = (value_a - value_b).abs();
    let mut base = value_a.max(value_b);
    if base <= 0.0 {
        base = value_a.abs().max(value_b.abs());
    }
    let percent_diff = if base == 0.0 {
        0.0
    } else {
        difference / base * 100.0
    };

    let status = if percent_diff <= EQUIVALENT_PERCENT {
        EquivalenceStatus::Balanced
    } else if percent_diff <= ACCEPTABLE_PERCENT {
        EquivalenceStatus::Acceptable
    } else {
        EquivalenceStatus::Unbalanced
    };
    let (higher_option, lower_option) = if value_a > value_b {
        (OptionSide::A, OptionSide::B)
    } else {
        (OptionSide::B, OptionSide::A)
    };

    EquivalenceAnalysis {
        value_a,
        value_b,
        difference: round_cents(difference),
        percent_diff: round_cents(percent_diff),
        is_equivalent: percent_diff <= EQUIVALENT_PERCENT,
        higher_option,
        lower_option,
        status,
    }
}

/// Evaluates both options of `domain` and compares them.
///
/// # Errors
///
/// Returns `CalcError` if either option cannot be evaluated.
pub fn analyze_domain(
    domain: ScenarioDomain,
    params_a: &BTreeMap<String, f64>,
    params_b: &BTreeMap<String, f64>,
) -> Result<EquivalenceAnalysis, CalcError> {
    let value_a = domain.evaluate(OptionSide::A, params_a)?;
    let value_b = domain.evaluate(OptionSide::B, params_b)?;
    Ok(analyze_equivalence(value_a, value_b))
}

/// Median of market reference values; `None` for an empty slice.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults(domain: ScenarioDomain) -> (BTreeMap<String, f64>, BTreeMap<String, f64>) {
        (
            domain.default_params(OptionSide::A),
            domain.default_params(OptionSide::B),
        )
    }

    #[test]
    fn insurance_defaults_match_worked_example() {
        let (a, b) = defaults(ScenarioDomain::Insurance);
        let analysis = analyze_domain(ScenarioDomain::Insurance, &a, &b).unwrap();
        assert_eq!(analysis.value_a, 665.0);
        assert_eq!(analysis.value_b, 590.0);
        assert_eq!(analysis.difference, 75.0);
        assert_eq!(analysis.percent_diff, 11.28);
        assert_eq!(analysis.status, EquivalenceStatus::Unbalanced);
        assert_eq!(analysis.higher_option, OptionSide::A);
    }

    #[test]
    fn banking_net_cost_can_go_negative() {
        let (a, b) = defaults(ScenarioDomain::Banking);
        assert_eq!(ScenarioDomain::Banking.evaluate(OptionSide::A, &a).unwrap(), 19.0);
        assert_eq!(ScenarioDomain::Banking.evaluate(OptionSide::B, &b).unwrap(), -18.0);
    }

    #[test]
    fn energy_options_read_their_own_rate() {
        let (a, b) = defaults(ScenarioDomain::Energy);
        let analysis = analyze_domain(ScenarioDomain::Energy, &a, &b).unwrap();
        assert_eq!(analysis.value_a, 86.0);
        assert_eq!(analysis.value_b, 81.0);
        assert_eq!(analysis.percent_diff, 5.81);
        assert_eq!(analysis.status, EquivalenceStatus::Acceptable);
    }

    #[test]
    fn close_values_are_balanced() {
        let analysis = analyze_equivalence(100.0, 96.0);
        assert!(analysis.is_equivalent);
        assert_eq!(analysis.status, EquivalenceStatus::Balanced);

        let analysis = analyze_equivalence(100.0, 92.0);
        assert!(!analysis.is_equivalent);
        assert_eq!(analysis.status, EquivalenceStatus::Acceptable);
    }

    #[test]
    fn zero_values_are_equivalent() {
        let analysis = analyze_equivalence(0.0, 0.0);
        assert_eq!(analysis.percent_diff, 0.0);
        assert!(analysis.is_equivalent);
    }

    #[test]
    fn missing_params_and_division_by_zero_are_errors() {
        let mut params = ScenarioDomain::Mobile.default_params(OptionSide::A);
        params.insert("dataGB".into(), 0.0);
        assert!(matches!(
            ScenarioDomain::Mobile.evaluate(OptionSide::A, &params),
            Err(CalcError::NonFinite { .. })
        ));

        params.remove("monthlyCost");
        assert_eq!(
            ScenarioDomain::Mobile.evaluate(OptionSide::A, &params),
            Err(CalcError::MissingParam {
                domain: ScenarioDomain::Mobile,
                side: OptionSide::A,
                name: "monthlyCost",
            })
        );
    }

    #[test]
    fn median_handles_even_and_odd_lengths() {
        assert_eq!(median(&[95.0, 0.0, 0.0, 0.0, 95.0]), Some(0.0));
        assert_eq!(median(&[250.0, 400.0, 500.0, 600.0]), Some(450.0));
        assert_eq!(median(&[]), None);
    }
}
