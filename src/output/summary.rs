use std::fmt::Write;

use chrono::{DateTime, FixedOffset};
use comfy_table::{Cell, Color as TableColor};

use crate::report::{AuditRow, EffortRow, SprintReport};

use super::styling::{bright, bright_green, bright_yellow, completion_percent, cyan, dim};
use super::tables::{color_coded_age_cell, color_coded_completion_cell, create_table};

/// Prints a human-readable sprint retrospective to stdout.
///
/// Displays color-coded tables covering the reconciled headline metrics,
/// the sprint schedule, velocity history, burndown, cycle-time series,
/// completed-work tables, hygiene audits, action items, and the team
/// roster.
///
/// Color coding:
/// - Green: completion ≥90%, item age ≤5 working days
/// - Yellow: completion 75-90%, item age 6-10 working days
/// - Red: completion <75%, item age >10 working days
pub fn print_summary(report: &SprintReport) {
    println!("{}", render_summary(report));
}

// Helper functions

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn format_timestamp(value: Option<DateTime<FixedOffset>>) -> String {
    value.map_or_else(
        || "N/A".to_string(),
        |d| d.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn effort_table(output: &mut String, rows: &[EffortRow]) {
    let mut table = create_table();
    table.set_header(create_cyan_header(&["#", "Key", "Summary", "Effort", "Status"]));
    for (idx, row) in rows.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&row.key),
            Cell::new(&row.summary),
            Cell::new(format!("{:.1}", row.effort)),
            Cell::new(&row.status),
        ]);
    }
    output.push_str(&format!("{table}\n\n"));
}

fn audit_table(output: &mut String, rows: &[AuditRow], all_clear: &str) {
    if rows.is_empty() {
        output.push_str(&format!("  {}\n\n", bright_green(all_clear)));
        return;
    }
    let mut table = create_table();
    table.set_header(create_cyan_header(&["Key", "Summary", "Assignee"]));
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.key),
            Cell::new(&row.summary),
            Cell::new(&row.assignee),
        ]);
    }
    output.push_str(&format!("{table}\n\n"));
}

#[allow(clippy::too_many_lines, clippy::format_push_string)]
fn render_summary(report: &SprintReport) -> String {
    let mut output = String::new();

    // Overview section
    add_section_header(&mut output, "📊", "Overview");

    let completion_display = completion_percent(report.metrics.completion_percentage());

    output.push_str(&format!(
        "  {} {}\n  {} {} ({})\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n\n",
        dim("Board:"),
        cyan(&report.board),
        dim("Sprint:"),
        cyan(&report.sprint.name),
        dim(&report.sprint.state),
        dim("Committed:"),
        bright_yellow(format!("{:.1}", report.metrics.committed)),
        dim("Completed:"),
        bright_yellow(format!("{:.1}", report.metrics.completed)),
        dim("Completion:"),
        completion_display,
        dim("Scope changes:"),
        bright_yellow(report.metrics.scope_change_count),
        dim("Carry-over items:"),
        bright_yellow(report.metrics.carry_over_count),
        dim("Generated:"),
        dim(report.generated_at.format("%Y-%m-%d %H:%M UTC"))
    ));

    // Schedule
    add_section_header(&mut output, "🗓", "Schedule");

    let mut schedule_table = create_table();
    schedule_table.set_header(create_cyan_header(&["", "Start", "End", "Working Days"]));
    schedule_table.add_row(vec![
        Cell::new("Planned"),
        Cell::new(format_timestamp(report.schedule.planned_start)),
        Cell::new(format_timestamp(report.schedule.planned_end)),
        Cell::new(report.schedule.planned_working_days),
    ]);
    schedule_table.add_row(vec![
        Cell::new("Actual"),
        Cell::new(format_timestamp(report.schedule.actual_start)),
        Cell::new(format_timestamp(report.schedule.actual_end)),
        Cell::new(report.schedule.actual_working_days),
    ]);
    output.push_str(&format!("{schedule_table}\n\n"));

    // Velocity history
    add_section_header(&mut output, "📈", "Velocity History");

    let mut velocity_table = create_table();
    velocity_table.set_header(create_cyan_header(&[
        "Sprint",
        "Committed",
        "Completed",
        "Completion",
    ]));
    for entry in &report.velocity_history {
        let rate = if entry.committed > 0.0 {
            (entry.completed / entry.committed) * 100.0
        } else {
            0.0
        };
        let name = if entry.is_current {
            format!("{} ◀", entry.name)
        } else {
            entry.name.clone()
        };
        velocity_table.add_row(vec![
            Cell::new(name),
            Cell::new(format!("{:.1}", entry.committed)),
            Cell::new(format!("{:.1}", entry.completed)),
            color_coded_completion_cell(rate),
        ]);
    }
    output.push_str(&format!("{velocity_table}\n\n"));

    // Burndown
    add_section_header(&mut output, "🔥", "Burndown");

    let mut burndown_table = create_table();
    burndown_table.set_header(create_cyan_header(&["Date", "Ideal", "Remaining"]));
    for (idx, date) in report.burndown.dates.iter().enumerate() {
        burndown_table.add_row(vec![
            Cell::new(date.format("%Y-%m-%d")),
            Cell::new(format!("{:.1}", report.burndown.ideal[idx])),
            Cell::new(format!("{:.1}", report.burndown.remaining[idx])),
        ]);
    }
    output.push_str(&format!("{burndown_table}\n\n"));

    // Cycle time
    add_section_header(&mut output, "⏱", "Cycle Time (hours per day)");

    if report.cycle_time.cycle.dates.is_empty() {
        output.push_str(&format!(
            "  {}\n\n",
            bright_yellow("No engineering-metrics data for this sprint.")
        ));
    } else {
        let mut cycle_table = create_table();
        cycle_table.set_header(create_cyan_header(&[
            "Date", "Coding", "Pickup", "Review", "Cycle",
        ]));
        for (idx, date) in report.cycle_time.cycle.dates.iter().enumerate() {
            cycle_table.add_row(vec![
                Cell::new(date.format("%Y-%m-%d")),
                Cell::new(format!("{:.1}", report.cycle_time.coding.values[idx])),
                Cell::new(format!("{:.1}", report.cycle_time.pickup.values[idx])),
                Cell::new(format!("{:.1}", report.cycle_time.review.values[idx])),
                Cell::new(format!("{:.1}", report.cycle_time.cycle.values[idx])),
            ]);
        }
        output.push_str(&format!("{cycle_table}\n\n"));
    }

    // Completed work
    add_section_header(&mut output, "🏆", "Top Completed Items");
    effort_table(&mut output, &report.top_completed);

    if !report.tech_debt_completed.is_empty() {
        add_section_header(&mut output, "🧹", "Tech Debt Completed");
        effort_table(&mut output, &report.tech_debt_completed);
    }

    add_section_header(&mut output, "🔁", "Carry-Over Items");
    if report.carry_over.is_empty() {
        output.push_str(&format!("  {}\n\n", bright_green("No carry-over items.")));
    } else {
        effort_table(&mut output, &report.carry_over);
    }

    // Hygiene audits
    add_section_header(&mut output, "🚩", "Missing Epic Link");
    audit_table(
        &mut output,
        &report.missing_epic,
        "All story-like items are linked to an epic.",
    );

    add_section_header(&mut output, "🚩", "Missing Estimate");
    audit_table(
        &mut output,
        &report.missing_effort,
        "All story-like items carry an estimate.",
    );

    // Action items
    if !report.action_items.open.is_empty() || !report.action_items.done.is_empty() {
        add_section_header(&mut output, "✅", "Action Items");

        if !report.action_items.open.is_empty() {
            let mut open_table = create_table();
            open_table.set_header(create_cyan_header(&[
                "Key", "Summary", "Assignee", "Status", "Age",
            ]));
            for item in &report.action_items.open {
                open_table.add_row(vec![
                    Cell::new(&item.key),
                    Cell::new(&item.summary),
                    Cell::new(&item.assignee),
                    Cell::new(&item.status),
                    color_coded_age_cell(item.age_working_days),
                ]);
            }
            output.push_str(&format!("{open_table}\n\n"));
        }

        if !report.action_items.done.is_empty() {
            let mut done_table = create_table();
            done_table.set_header(create_cyan_header(&["Key", "Summary", "Assignee", "Status"]));
            for item in &report.action_items.done {
                done_table.add_row(vec![
                    Cell::new(&item.key),
                    Cell::new(&item.summary),
                    Cell::new(&item.assignee),
                    Cell::new(&item.status),
                ]);
            }
            output.push_str(&format!("{done_table}\n\n"));
        }
    }

    // Team roster
    add_section_header(&mut output, "👥", "Team");
    if report.team.is_empty() {
        output.push_str(&format!("  {}\n", bright_yellow("No assignees found.")));
    } else {
        for name in &report.team {
            output.push_str(&format!("  {} {}\n", cyan("•"), name));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{
        ActionItems, AgeingRecord, BurndownSeries, CycleBreakdown, DaySeries, DoneActionItem,
        ReconciledMetrics, SprintSchedule, SprintSummary, VelocityEntry,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn effort_row(key: &str, summary: &str, effort: f64, status: &str) -> EffortRow {
        EffortRow {
            key: key.to_string(),
            summary: summary.to_string(),
            effort,
            status: status.to_string(),
        }
    }

    fn sample_report() -> SprintReport {
        let dates = vec![date(2024, 3, 4), date(2024, 3, 5)];
        let series = DaySeries {
            dates: dates.clone(),
            values: vec![1.5, 2.0],
        };
        SprintReport {
            board: "GVRE Board".to_string(),
            sprint: SprintSummary {
                id: 77,
                name: "GVRE Sprint 18".to_string(),
                state: "closed".to_string(),
            },
            generated_at: Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap(),
            schedule: SprintSchedule {
                planned_start: None,
                planned_end: None,
                actual_start: None,
                actual_end: None,
                planned_working_days: 8,
                actual_working_days: 8,
            },
            metrics: ReconciledMetrics {
                committed: 50.0,
                completed: 35.0,
                scope_change_count: 2,
                carry_over_count: 1,
            },
            velocity_history: vec![
                VelocityEntry {
                    sprint_id: 76,
                    name: "GVRE Sprint 17".to_string(),
                    committed: 40.0,
                    completed: 38.0,
                    is_current: false,
                },
                VelocityEntry {
                    sprint_id: 77,
                    name: "GVRE Sprint 18".to_string(),
                    committed: 50.0,
                    completed: 35.0,
                    is_current: true,
                },
            ],
            burndown: BurndownSeries {
                dates,
                ideal: vec![50.0, 45.0],
                remaining: vec![50.0, 30.0],
            },
            cycle_time: CycleBreakdown {
                coding: series.clone(),
                pickup: series.clone(),
                review: series.clone(),
                cycle: series,
            },
            top_completed: vec![effort_row("GV-1", "Voucher issuance flow", 20.0, "Done")],
            tech_debt_completed: vec![effort_row("GV-8", "Retire legacy webhook", 5.0, "Done")],
            carry_over: vec![effort_row("GV-3", "Carried over work", 15.0, "In Progress")],
            missing_epic: vec![AuditRow {
                key: "GV-9".to_string(),
                summary: "Orphaned story".to_string(),
                assignee: "Priya Nair".to_string(),
            }],
            missing_effort: vec![],
            action_items: ActionItems {
                open: vec![AgeingRecord {
                    key: "GV-50".to_string(),
                    summary: "Document rollback runbook".to_string(),
                    assignee: "Arun Menon".to_string(),
                    status: "In Progress".to_string(),
                    age_working_days: 12,
                }],
                done: vec![DoneActionItem {
                    key: "GV-48".to_string(),
                    summary: "Add staging smoke test".to_string(),
                    assignee: "Priya Nair".to_string(),
                    status: "Done".to_string(),
                }],
            },
            team: vec!["Arun Menon".to_string(), "Priya Nair".to_string()],
        }
    }

    #[test]
    fn test_render_summary_overview_and_metrics() {
        let output = render_summary(&sample_report());

        assert!(output.contains("GVRE Board"));
        assert!(output.contains("GVRE Sprint 18"));
        assert!(output.contains("Committed:"));
        assert!(output.contains("50.0"));
        assert!(output.contains("70.0%"));
        assert!(output.contains("Scope changes:"));
    }

    #[test]
    fn test_render_summary_velocity_marks_current_sprint() {
        let output = render_summary(&sample_report());

        assert!(output.contains("Velocity History"));
        assert!(output.contains("GVRE Sprint 17"));
        assert!(output.contains("GVRE Sprint 18 ◀"));
    }

    #[test]
    fn test_render_summary_includes_all_tables() {
        let output = render_summary(&sample_report());

        assert!(output.contains("Schedule"));
        assert!(output.contains("Burndown"));
        assert!(output.contains("Cycle Time"));
        assert!(output.contains("Top Completed Items"));
        assert!(output.contains("Tech Debt Completed"));
        assert!(output.contains("Carry-Over Items"));
        assert!(output.contains("Missing Epic Link"));
        assert!(output.contains("Missing Estimate"));
        assert!(output.contains("Action Items"));
        assert!(output.contains("GV-50"));
        assert!(output.contains("12d"));
    }

    #[test]
    fn test_render_summary_empty_audit_shows_all_clear() {
        let output = render_summary(&sample_report());

        // Missing-estimate audit is empty in the fixture
        assert!(output.contains("All story-like items carry an estimate."));
        // Missing-epic audit is not
        assert!(output.contains("GV-9"));
    }

    #[test]
    fn test_render_summary_team_roster() {
        let output = render_summary(&sample_report());

        assert!(output.contains("Team"));
        assert!(output.contains("Arun Menon"));
        assert!(output.contains("Priya Nair"));
    }

    #[test]
    fn test_render_summary_no_cycle_data_note() {
        let mut report = sample_report();
        report.cycle_time = CycleBreakdown::default();

        let output = render_summary(&report);
        assert!(output.contains("No engineering-metrics data for this sprint."));
    }

    #[test]
    fn test_render_summary_no_action_items_skips_section() {
        let mut report = sample_report();
        report.action_items = ActionItems::default();

        let output = render_summary(&report);
        assert!(!output.contains("Action Items"));
    }
}
