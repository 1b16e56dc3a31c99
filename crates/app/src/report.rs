//! Plain-text rendering of command results.

use std::fmt::Write as _;

use prosody_core::analysis::checklist::critical_failures;
use prosody_core::analysis::{CalcError, EquivalenceAnalysis, ScenarioDomain, TextComparison};
use prosody_core::model::sections::QualityChecklistState;
use prosody_core::model::{PersistedDocument, PhaseId};
use prosody_core::time::{epoch, format_timestamp};
use services::SyncState;

pub fn status(
    document: &PersistedDocument,
    phase: PhaseId,
    cloud_enabled: bool,
    sync: &SyncState,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Phase:        {} ({phase})", phase.title());
    let updated = document.last_updated();
    if updated == epoch() {
        let _ = writeln!(out, "Last updated: never");
    } else {
        let _ = writeln!(out, "Last updated: {}", format_timestamp(updated));
    }
    let names: Vec<&str> = document.section_names().collect();
    if names.is_empty() {
        let _ = writeln!(out, "Sections:     none");
    } else {
        let _ = writeln!(out, "Sections:     {}", names.join(", "));
    }
    if cloud_enabled {
        let _ = writeln!(out, "Cloud sync:   enabled ({sync})");
    } else {
        let _ = writeln!(out, "Cloud sync:   disabled (local only)");
    }
    out
}

pub fn equivalence(domain: ScenarioDomain, result: &Result<EquivalenceAnalysis, CalcError>) -> String {
    match result {
        Ok(analysis) => format!(
            "{:<13} A {:>10.2}  B {:>10.2}  diff {:.2} ({:.2}%)  {}; {} is higher",
            domain.title(),
            analysis.value_a,
            analysis.value_b,
            analysis.difference,
            analysis.percent_diff,
            analysis.status.as_str(),
            analysis.higher_option,
        ),
        Err(err) => format!("{:<13} error: {err}", domain.title()),
    }
}

pub fn balance(label: &str, comparison: &TextComparison) -> String {
    let mut out = String::new();
    let verdict = if comparison.balanced { "balanced" } else { "unbalanced" };
    let _ = writeln!(out, "{label}: {verdict}");
    for (side, stats) in [("A", &comparison.stats_a), ("B", &comparison.stats_b)] {
        let _ = writeln!(
            out,
            "  {side}: {} sentences, {} words, {} chars, {} numbers",
            stats.sentences, stats.words, stats.characters, stats.numbers
        );
    }
    let _ = writeln!(
        out,
        "  word gap {:.1}%, char gap {:.1}%",
        comparison.word_diff_percent, comparison.char_diff_percent
    );
    for issue in &comparison.issues {
        let _ = writeln!(out, "  - {issue}");
    }
    out
}

pub fn checklist(state: &QualityChecklistState) -> String {
    let scenarios = state.scenarios();
    if scenarios.is_empty() {
        return "No checklist scenarios.\n".to_owned();
    }
    let mut out = String::new();
    for scenario in scenarios {
        let _ = writeln!(
            out,
            "#{} {} [{}] {}% {}",
            scenario.id,
            scenario.name,
            scenario.domain,
            scenario.progress(),
            scenario.derived_status().as_str()
        );
        for failed in critical_failures(&scenario.checks) {
            let _ = writeln!(out, "  critical failure: {}/{}", failed.category, failed.id);
        }
    }
    out
}
