//! User-facing run and registry reports.

use std::fmt::Write as _;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::discovery::RepoDescriptor;
use crate::orchestrator::{RepoResult, RunSummary};
use crate::registry::{RegistryEntry, RunStatus};

const RULE_WIDTH: usize = 60;

/// Per-repository outcome lines followed by aggregate counts.
pub fn render_summary(summary: &RunSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule);

    for report in &summary.reports {
        let line = match &report.result {
            RepoResult::Skipped => format!("{} {}", "SKIPPED ".dimmed(), report.name),
            RepoResult::Analyzed { verdict, harvested } => format!(
                "{} {} ({}, {} output folder(s))",
                "ANALYZED".green().bold(),
                report.name,
                verdict.describe(),
                harvested
            ),
            RepoResult::Failed { reason } => {
                format!("{} {}: {}", "FAILED  ".red().bold(), report.name, reason)
            }
        };
        let _ = writeln!(out, "{}", line);
    }

    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "{} repository(ies): {} analyzed, {} failed, {} skipped",
        summary.total(),
        summary.analyzed(),
        summary.failed(),
        summary.skipped()
    );
    out
}

/// Discovered repositories, one per line (the `discover` subcommand).
pub fn render_discovered(repos: &[RepoDescriptor]) -> String {
    let mut out = String::new();
    for repo in repos {
        let _ = writeln!(out, "Discovered repo: {} -> {}", repo.name, repo.clone_url);
    }
    let _ = writeln!(out, "Found {} repository(ies) to analyze", repos.len());
    out
}

fn status_cell(status: RunStatus) -> String {
    match status {
        RunStatus::Analyzed => status.as_str().green().to_string(),
        RunStatus::Failed => status.as_str().red().to_string(),
        RunStatus::Running => status.as_str().yellow().to_string(),
        RunStatus::Pending => status.as_str().to_string(),
    }
}

/// Registry contents as a table (the `status` subcommand).
pub fn status_table<'a>(entries: impl IntoIterator<Item = &'a RegistryEntry>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Repository", "Status", "Last updated", "Log", "Notes"]);

    for entry in entries {
        table.add_row(vec![
            entry.repo_name.clone(),
            status_cell(entry.status),
            entry.last_updated.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            entry.log_path.display().to_string(),
            entry.notes.clone().unwrap_or_default(),
        ]);
    }
    table
}
