use std::collections::{HashMap, HashSet};

use crate::report::EffortRow;

use super::fields::FieldSchema;
use super::reconcile::issue_effort;
use super::types::{Issue, SprintReportDoc};

/// Case-insensitive membership test against the terminal-but-not-delivered
/// status names (cancelled variants and the like).
pub fn is_excluded_status(status: &str, excluded: &[String]) -> bool {
    excluded
        .iter()
        .any(|name| name.eq_ignore_ascii_case(status.trim()))
}

pub fn is_story_like(issue: &Issue, story_types: &[String]) -> bool {
    issue
        .fields
        .type_name()
        .map(|name| story_types.iter().any(|t| t.eq_ignore_ascii_case(name)))
        .unwrap_or(false)
}

fn truncate_summary(summary: &str, max_chars: usize) -> String {
    if summary.chars().count() <= max_chars {
        return summary.to_string();
    }
    let mut truncated: String = summary.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

fn effort_row(
    issue: &Issue,
    schema: &FieldSchema,
    report_effort: &HashMap<String, f64>,
    max_chars: usize,
) -> EffortRow {
    EffortRow {
        key: issue.key.clone(),
        summary: truncate_summary(issue.fields.summary_text(), max_chars),
        effort: issue_effort(schema, report_effort, issue),
        status: issue.fields.status_name().to_string(),
    }
}

fn sort_by_effort_desc(rows: &mut [EffortRow]) {
    rows.sort_by(|a, b| b.effort.total_cmp(&a.effort).then(a.key.cmp(&b.key)));
}

/// Top completed story-like items by effort, limited to `limit` rows.
///
/// `issues` is the result of the done-filtered sprint walk; completion
/// is re-checked client-side when the walker could not filter
/// server-side.
pub fn top_completed(
    issues: &[Issue],
    server_filtered: bool,
    schema: &FieldSchema,
    report_effort: &HashMap<String, f64>,
    story_types: &[String],
    limit: usize,
    max_chars: usize,
) -> Vec<EffortRow> {
    let mut rows: Vec<EffortRow> = issues
        .iter()
        .filter(|i| server_filtered || i.fields.is_done())
        .filter(|i| is_story_like(i, story_types))
        .map(|i| effort_row(i, schema, report_effort, max_chars))
        .collect();

    sort_by_effort_desc(&mut rows);
    rows.truncate(limit);
    rows
}

/// Completed items linked to the tech-debt epic, by effort descending.
pub fn tech_debt_completed(
    issues: &[Issue],
    server_filtered: bool,
    schema: &FieldSchema,
    report_effort: &HashMap<String, f64>,
    tech_debt_epic: &str,
    excluded: &[String],
    max_chars: usize,
) -> Vec<EffortRow> {
    let mut rows: Vec<EffortRow> = issues
        .iter()
        .filter(|i| server_filtered || i.fields.is_done())
        .filter(|i| !is_excluded_status(i.fields.status_name(), excluded))
        .filter(|i| schema.epic_key_of(&i.fields).as_deref() == Some(tech_debt_epic))
        .map(|i| effort_row(i, schema, report_effort, max_chars))
        .collect();

    sort_by_effort_desc(&mut rows);
    rows
}

/// Items the sprint report flagged as not completed, enriched with
/// status and effort from the full issue walk, by effort descending.
pub fn carry_over_rows(
    report: &SprintReportDoc,
    issues: &[Issue],
    schema: &FieldSchema,
    report_effort: &HashMap<String, f64>,
    max_chars: usize,
) -> Vec<EffortRow> {
    let carried: HashSet<&str> = report
        .contents
        .issues_not_completed_in_current_sprint
        .iter()
        .map(|i| i.key.as_str())
        .collect();

    let mut rows: Vec<EffortRow> = issues
        .iter()
        .filter(|i| carried.contains(i.key.as_str()))
        .map(|i| effort_row(i, schema, report_effort, max_chars))
        .collect();

    sort_by_effort_desc(&mut rows);
    rows
}
