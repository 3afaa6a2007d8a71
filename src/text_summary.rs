//! Text summary builder for CLI output.
//!
//! Formats human-readable lines for text mode from a finished kitchen report.

use crate::model::{format_time_left, KitchenReport, RunnerPhase};

/// Pre-formatted lines for text output.
pub struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary from a finished simulation run.
pub fn build_text_summary(report: &KitchenReport) -> TextSummary {
    let mut lines = Vec::new();

    let completed = report
        .recipes
        .iter()
        .filter(|r| r.phase == RunnerPhase::Completed)
        .count();
    let cancelled = report
        .recipes
        .iter()
        .filter(|r| r.phase == RunnerPhase::Cancelled)
        .count();
    lines.push(format!(
        "Kitchen run finished: {completed} completed, {cancelled} cancelled ({} total)",
        report.recipes.len()
    ));

    for outcome in &report.recipes {
        lines.push(format!(
            "{:<24} {:?}  progress {:>5.1}%  simulated {}s/{}s  left {}",
            outcome.name,
            outcome.phase,
            outcome.progress_percent,
            outcome.total_elapsed,
            outcome.total_duration,
            format_time_left(outcome.time_left_seconds),
        ));
    }

    if !report.history.is_empty() {
        lines.push(String::new());
        lines.push("History:".to_string());
        for entry in &report.history {
            lines.push(format!("  {entry}"));
        }
    }

    TextSummary { lines }
}
