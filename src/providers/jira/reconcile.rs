use std::collections::HashMap;

use crate::report::ReconciledMetrics;

use super::fields::FieldSchema;
use super::types::{Issue, ReportIssue, SprintReportDoc, VelocityChart, VelocityStatEntry};

/// Which upstream supplied the committed/completed numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsSource {
    VelocityChart,
    SprintReport,
}

/// Reconciles a sprint's headline metrics.
///
/// The velocity chart is the authoritative source for committed and
/// completed effort because it matches what the tracker itself displays.
/// When the chart is unavailable or has no entry for this sprint, both
/// numbers fall back to sprint-report arithmetic. Scope-change and
/// carry-over counts always come from the report bookkeeping; the chart
/// does not carry them.
pub fn reconcile_metrics(
    chart: Option<&VelocityChart>,
    sprint_id: u64,
    report: &SprintReportDoc,
) -> (ReconciledMetrics, MetricsSource) {
    let fallback = metrics_from_report(report);

    if let Some(entry) = chart.and_then(|c| velocity_entry(c, sprint_id)) {
        let committed = entry.estimated.as_ref().and_then(|s| s.value).unwrap_or(0.0);
        let completed = entry.completed.as_ref().and_then(|s| s.value).unwrap_or(0.0);
        return (
            ReconciledMetrics {
                committed,
                completed,
                scope_change_count: fallback.scope_change_count,
                carry_over_count: fallback.carry_over_count,
            },
            MetricsSource::VelocityChart,
        );
    }

    (fallback, MetricsSource::SprintReport)
}

/// Committed/completed effort and scope bookkeeping from the sprint
/// report alone.
///
/// Committed sums the estimates of everything planned at sprint start:
/// completed and not-completed items minus anything added mid-sprint.
/// Completed sums all completed items, including mid-sprint additions.
pub fn metrics_from_report(report: &SprintReportDoc) -> ReconciledMetrics {
    let contents = &report.contents;
    let added_mid = &contents.issue_keys_added_during_sprint;

    let completed: f64 = contents.completed_issues.iter().map(ReportIssue::effort).sum();

    let mut committed = 0.0;
    for item in contents
        .completed_issues
        .iter()
        .chain(&contents.issues_not_completed_in_current_sprint)
    {
        if !added_mid.contains_key(&item.key) {
            committed += item.effort();
        }
    }

    ReconciledMetrics {
        committed,
        completed,
        scope_change_count: added_mid.len(),
        carry_over_count: contents.issues_not_completed_in_current_sprint.len(),
    }
}

/// Finds a sprint's entry in the velocity chart.
///
/// Entry keys are sprint ids rendered as strings, but not every
/// upstream renders them canonically, so an exact lookup is followed by
/// a numeric-equality scan over the keys.
pub fn velocity_entry(chart: &VelocityChart, sprint_id: u64) -> Option<&VelocityStatEntry> {
    if let Some(entry) = chart.velocity_stat_entries.get(&sprint_id.to_string()) {
        return Some(entry);
    }
    chart
        .velocity_stat_entries
        .iter()
        .find_map(|(key, entry)| (key.trim().parse::<u64>() == Ok(sprint_id)).then_some(entry))
}

/// Issue key to effort, from the report's estimate statistics. Serves
/// as the secondary effort source for table builders when an issue's
/// own estimation fields are empty.
pub fn effort_map_from_report(report: &SprintReportDoc) -> HashMap<String, f64> {
    let contents = &report.contents;
    let mut map = HashMap::new();
    for item in contents
        .completed_issues
        .iter()
        .chain(&contents.issues_not_completed_in_current_sprint)
    {
        map.insert(item.key.clone(), item.effort());
    }
    map
}

/// Effort for one issue as the table builders see it: the issue's own
/// estimation fields first, then the report's estimate statistic, then
/// zero.
pub fn issue_effort(
    schema: &FieldSchema,
    report_effort: &HashMap<String, f64>,
    issue: &Issue,
) -> f64 {
    schema
        .effort_of(&issue.fields)
        .or_else(|| report_effort.get(&issue.key).copied())
        .unwrap_or(0.0)
}
