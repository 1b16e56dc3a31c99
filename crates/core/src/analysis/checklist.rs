use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Recorded check outcomes, keyed by category and then by check id.
pub type ChecksByCategory = BTreeMap<String, BTreeMap<String, String>>;

pub const PASS: &str = "pass";
pub const FAIL: &str = "fail";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckDefinition {
    pub category: &'static str,
    pub id: &'static str,
    pub critical: bool,
}

const fn check(category: &'static str, id: &'static str, critical: bool) -> CheckDefinition {
    CheckDefinition {
        category,
        id,
        critical,
    }
}

/// Every pre-deployment check a scenario must go through.
pub const CATALOG: [CheckDefinition; 36] = [
    check("textBalance", "tb1", true),
    check("textBalance", "tb2", true),
    check("textBalance", "tb3", true),
    check("textBalance", "tb4", true),
    check("textBalance", "tb5", true),
    check("textBalance", "tb6", true),
    check("textBalance", "tb7", false),
    check("numericEquivalence", "ne1", true),
    check("numericEquivalence", "ne2", true),
    check("numericEquivalence", "ne3", true),
    check("numericEquivalence", "ne4", false),
    check("prosodyAnnotation", "pa1", true),
    check("prosodyAnnotation", "pa2", true),
    check("prosodyAnnotation", "pa3", true),
    check("prosodyAnnotation", "pa4", true),
    check("prosodyAnnotation", "pa5", false),
    check("comprehensionChecks", "cc1", true),
    check("comprehensionChecks", "cc2", true),
    check("comprehensionChecks", "cc3", true),
    check("comprehensionChecks", "cc4", true),
    check("comprehensionChecks", "cc5", false),
    check("fillerBreaks", "fb1", true),
    check("fillerBreaks", "fb2", false),
    check("fillerBreaks", "fb3", false),
    check("fillerBreaks", "fb4", false),
    check("technical", "te1", true),
    check("technical", "te2", true),
    check("technical", "te3", false),
    check("technical", "te4", false),
    check("technical", "te5", true),
    check("pilot", "pt1", true),
    check("pilot", "pt2", true),
    check("pilot", "pt3", true),
    check("pilot", "pt4", true),
    check("pilot", "pt5", false),
    check("pilot", "pt6", false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChecklistStatus {
    Draft,
    InProgress,
    NeedsWork,
    Approved,
}

impl ChecklistStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChecklistStatus::Draft => "draft",
            ChecklistStatus::InProgress => "in-progress",
            ChecklistStatus::NeedsWork => "needs-work",
            ChecklistStatus::Approved => "approved",
        }
    }
}

impl fmt::Display for ChecklistStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn outcome<'a>(checks: &'a ChecksByCategory, def: &CheckDefinition) -> Option<&'a str> {
    checks
        .get(def.category)
        .and_then(|by_id| by_id.get(def.id))
        .map(String::as_str)
}

fn is_completed(status: Option<&str>) -> bool {
    matches!(status, Some(PASS | FAIL))
}

/// Number of catalogue checks with a pass or fail verdict.
#[must_use]
pub fn completed(checks: &ChecksByCategory) -> usize {
    CATALOG
        .iter()
        .filter(|def| is_completed(outcome(checks, def)))
        .count()
}

/// Completion percentage, rounded to the nearest whole percent.
#[must_use]
pub fn progress(checks: &ChecksByCategory) -> u8 {
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = (completed(checks) as f64 / CATALOG.len() as f64 * 100.0).round() as u8;
    percent
}

/// Status implied by the recorded outcomes.
///
/// A scenario stays in progress until every check has a verdict; any failed
/// critical check then sends it back for rework.
#[must_use]
pub fn derive_status(checks: &ChecksByCategory) -> ChecklistStatus {
    if completed(checks) < CATALOG.len() {
        return ChecklistStatus::InProgress;
    }
    let critical_failure = CATALOG
        .iter()
        .any(|def| def.critical && outcome(checks, def) == Some(FAIL));
    if critical_failure {
        ChecklistStatus::NeedsWork
    } else {
        ChecklistStatus::Approved
    }
}

/// Critical checks that currently fail.
#[must_use]
pub fn critical_failures(checks: &ChecksByCategory) -> Vec<&'static CheckDefinition> {
    CATALOG
        .iter()
        .filter(|def| def.critical && outcome(checks, def) == Some(FAIL))
        .collect()
}
