use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::config::ScorecardConfig;
use crate::models::{Flag, FlaggedRecord, ScorecardRun, Severity};
use crate::pipeline::RecordSet;

/// The oldest backlog tickets, worst first, for the report detail section.
pub fn oldest_backlog<'a>(records: &'a [FlaggedRecord], limit: usize) -> Vec<&'a FlaggedRecord> {
    let mut backlog: Vec<&FlaggedRecord> = records
        .iter()
        .filter(|record| record.flag(Flag::IsBacklog) == Some(true))
        .collect();
    backlog.sort_by(|a, b| {
        b.age_days
            .partial_cmp(&a.age_days)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    backlog.truncate(limit);
    backlog
}

/// Renders the full run as a markdown report.
pub fn build_report(
    run: &ScorecardRun,
    records: &RecordSet,
    config: &ScorecardConfig,
    as_of: NaiveDateTime,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Service Desk Scorecard");
    let _ = writeln!(
        output,
        "{} (config v{}), as of {}",
        config.metadata.organization,
        config.metadata.version,
        as_of.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Overall score: {:.1}/100 ({})",
        run.overall_score, run.overall_status
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## KPIs");

    for kpi in &run.kpis {
        let weight = run.weights.get(&kpi.id).copied().unwrap_or(0.0);
        let _ = writeln!(
            output,
            "- {} ({}): {:.1}% adherence, {} impact, weight {:.0}%",
            kpi.name, kpi.id, kpi.adherence, kpi.impact, weight
        );
        if kpi.no_data {
            let _ = writeln!(output, "  - No data in this window; adherence is vacuous.");
            continue;
        }
        for sub in &kpi.sub_counts {
            let _ = writeln!(
                output,
                "  - {}: {} (target at most {})",
                sub.label, sub.count, sub.target
            );
        }
        if kpi.sub_counts.is_empty() {
            let _ = writeln!(
                output,
                "  - {} of {} records ({:.1}%)",
                kpi.numerator, kpi.denominator, kpi.observed
            );
        }
    }

    let objective = &run.objective;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Objective {}: {}", objective.id, objective.name);
    let _ = writeln!(
        output,
        "Score {:.1}/100 ({})",
        objective.score, objective.grade
    );
    let _ = writeln!(output);

    for kr in &objective.key_results {
        let _ = writeln!(
            output,
            "- {} ({}): score {:.1}, {} -- current {:.1} vs target {:.1}, gap {:+.1}",
            kr.name, kr.id, kr.score, kr.grade, kr.current, kr.target, kr.gap
        );
        let _ = writeln!(
            output,
            "  - Owner: {}, deadline {}",
            kr.owner, kr.deadline
        );
    }

    let backlog = oldest_backlog(&records.incidents, 5);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Oldest Backlog Tickets");

    if backlog.is_empty() {
        let _ = writeln!(output, "No backlog tickets in this window.");
    } else {
        for record in backlog {
            let _ = writeln!(
                output,
                "- {} (P{}, {}): {:.0} days old, {} reassignments",
                record.id,
                record.priority,
                record.state,
                record.age_days,
                record.reassignment_count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommended Actions");

    if objective.actions.is_empty() {
        let _ = writeln!(output, "No action triggers; all key results on track.");
    } else {
        for action in &objective.actions {
            let marker = match action.severity {
                Severity::Critical => "CRITICAL",
                Severity::Warning => "Warning",
            };
            let _ = writeln!(
                output,
                "- [{}] {}: {} (owner: {})",
                marker, action.kr_id, action.action, action.owner
            );
        }
    }

    output
}
