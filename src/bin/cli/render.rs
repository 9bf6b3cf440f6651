//! Terminal and JSON rendering of tracked deployments

use chrono::{DateTime, Utc};
use deploy_tracker::domain::Input;
use deploy_tracker::{HistoryEntry, RunConclusion, RunStatus, TrackedDeployment};
use serde::Serialize;
use std::time::Duration;

/// JSON shape of a tracked deployment
#[derive(Debug, Serialize)]
pub struct TrackedView<'a> {
    pub id: &'a str,
    pub run_id: &'a str,
    pub workflow: &'a str,
    pub branch: &'a str,
    pub repo: &'a str,
    pub status: RunStatus,
    pub conclusion: Option<RunConclusion>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
}

impl<'a> From<&'a TrackedDeployment> for TrackedView<'a> {
    fn from(td: &'a TrackedDeployment) -> Self {
        Self {
            id: td.id(),
            run_id: td.run_id(),
            workflow: td.workflow().name(),
            branch: td.branch(),
            repo: td.repo(),
            status: td.status(),
            conclusion: td.conclusion(),
            started_at: td.started_at(),
            completed_at: td.completed_at(),
            elapsed_secs: td.elapsed_time().as_secs(),
        }
    }
}

pub fn to_json(tracked: &[TrackedDeployment]) -> serde_json::Result<String> {
    let views: Vec<TrackedView<'_>> = tracked.iter().map(TrackedView::from).collect();
    serde_json::to_string_pretty(&views)
}

pub fn status_icon(td: &TrackedDeployment) -> &'static str {
    match (td.status(), td.conclusion()) {
        (_, Some(RunConclusion::Success)) => "✓",
        (_, Some(RunConclusion::Failure)) => "✗",
        (_, Some(RunConclusion::Cancelled)) => "⊘",
        (_, Some(_)) => "•",
        (RunStatus::InProgress, None) => "▶",
        (RunStatus::Queued, None) => "⏳",
        _ => "?",
    }
}

pub fn status_label(td: &TrackedDeployment) -> String {
    match td.conclusion() {
        Some(conclusion) => conclusion.to_string(),
        None => td.status().to_string(),
    }
}

/// Compact elapsed time such as `1h 02m`, `3m 04s` or `12s`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn print_table(tracked: &[TrackedDeployment]) {
    if tracked.is_empty() {
        println!("No tracked deployments");
        return;
    }

    println!(
        "  {:<14} {:<28} {:<20} {:<12} {:>9}",
        "RUN", "WORKFLOW", "BRANCH", "STATUS", "ELAPSED"
    );
    for td in tracked {
        println!(
            "{} {:<14} {:<28} {:<20} {:<12} {:>9}",
            status_icon(td),
            td.run_id(),
            truncate(td.workflow().name(), 28),
            truncate(td.branch(), 20),
            status_label(td),
            format_elapsed(td.elapsed_time()),
        );
    }
}

pub fn print_details(td: &TrackedDeployment) {
    println!("{} Deployment {}", status_icon(td), td.id());
    println!("  Workflow: {}", td.workflow());
    println!("  Branch: {}", td.branch());
    if !td.repo().is_empty() {
        println!("  Repository: {}", td.repo());
    }
    println!("  Status: {}", td.status());
    if let Some(conclusion) = td.conclusion() {
        println!("  Conclusion: {}", conclusion);
    }
    println!("  Started: {}", td.started_at().to_rfc3339());
    if let Some(completed) = td.completed_at() {
        println!("  Completed: {}", completed.to_rfc3339());
    }
    println!("  Elapsed: {}", format_elapsed(td.elapsed_time()));
}

pub fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("No deployment history");
        return;
    }

    println!("  {:<14} {:<19} {}", "RUN", "TRIGGERED", "DEPLOYMENT");
    for entry in entries {
        println!(
            "  {:<14} {:<19} {}",
            entry.id,
            entry.triggered_at.format("%Y-%m-%d %H:%M:%S"),
            entry.label(),
        );
    }
}

/// Multi-line description of a history entry, in the style of a deployment summary
pub fn history_summary(entry: &HistoryEntry) -> String {
    let mut summary = format!("{}\nPrevious run: {}\n", entry.label(), entry.id);
    for (key, value) in &entry.inputs {
        summary.push_str(&format!("  {key}={value}\n"));
    }
    summary
}

pub fn print_inputs(workflow: &str, inputs: &[Input]) {
    if inputs.is_empty() {
        println!("Workflow {workflow} declares no dispatch inputs");
        return;
    }

    println!("  {:<24} {:<10} {:<9} {}", "INPUT", "TYPE", "REQUIRED", "DEFAULT");
    for input in inputs {
        println!(
            "  {:<24} {:<10} {:<9} {}",
            truncate(input.key(), 24),
            input.kind().label(),
            if input.is_required() { "yes" } else { "no" },
            input.value(),
        );
        if let deploy_tracker::domain::InputKind::Choice(options) = input.kind() {
            println!("  {:<24} options: {}", "", options.join(", "));
        }
    }
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let kept: String = value.chars().take(width.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
