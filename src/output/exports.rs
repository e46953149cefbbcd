use anyhow::Result;
use std::io::Write;

use crate::config::OutputFormat;
use crate::report::{EffortRow, SprintReport};

/// Exports a sprint report to machine-readable formats.
///
/// - JSON: the full report model for programmatic access
/// - CSV: sectioned tables for spreadsheet analysis
/// - Summary: human-readable terminal output (handled in cli.rs)
pub fn export_report(
    report: &SprintReport,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Summary => {
            // Summary format is handled separately in cli.rs
            unreachable!("Summary format should be handled in CLI")
        }
        OutputFormat::Json => export_json(report, pretty, output),
        OutputFormat::Csv => export_csv(report, output),
    }
}

fn export_json(report: &SprintReport, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    writeln!(output, "{}", json)?;
    Ok(())
}

fn csv_escape(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn write_effort_rows(output: &mut dyn Write, section: &str, rows: &[EffortRow]) -> Result<()> {
    writeln!(output)?;
    writeln!(output, "Section,Key,Summary,Effort,Status")?;
    for row in rows {
        writeln!(
            output,
            "{},{},{},{:.1},{}",
            section,
            row.key,
            csv_escape(&row.summary),
            row.effort,
            csv_escape(&row.status)
        )?;
    }
    Ok(())
}

fn export_csv(report: &SprintReport, output: &mut dyn Write) -> Result<()> {
    // Headline metrics
    writeln!(
        output,
        "Board,Sprint,Committed,Completed,Completion Rate,Scope Changes,Carry Over"
    )?;
    writeln!(
        output,
        "{},{},{:.1},{:.1},{:.1},{},{}",
        csv_escape(&report.board),
        csv_escape(&report.sprint.name),
        report.metrics.committed,
        report.metrics.completed,
        report.metrics.completion_percentage(),
        report.metrics.scope_change_count,
        report.metrics.carry_over_count
    )?;

    // Velocity history
    writeln!(output)?;
    writeln!(output, "Sprint,Committed,Completed,Current")?;
    for entry in &report.velocity_history {
        writeln!(
            output,
            "{},{:.1},{:.1},{}",
            csv_escape(&entry.name),
            entry.committed,
            entry.completed,
            entry.is_current
        )?;
    }

    // Burndown
    writeln!(output)?;
    writeln!(output, "Date,Ideal,Remaining")?;
    for (idx, date) in report.burndown.dates.iter().enumerate() {
        writeln!(
            output,
            "{},{:.1},{:.1}",
            date.format("%Y-%m-%d"),
            report.burndown.ideal[idx],
            report.burndown.remaining[idx]
        )?;
    }

    // Cycle time series in hours
    writeln!(output)?;
    writeln!(output, "Date,Coding,Pickup,Review,Cycle")?;
    for (idx, date) in report.cycle_time.cycle.dates.iter().enumerate() {
        writeln!(
            output,
            "{},{:.2},{:.2},{:.2},{:.2}",
            date.format("%Y-%m-%d"),
            report.cycle_time.coding.values[idx],
            report.cycle_time.pickup.values[idx],
            report.cycle_time.review.values[idx],
            report.cycle_time.cycle.values[idx]
        )?;
    }

    write_effort_rows(output, "Top Completed", &report.top_completed)?;
    write_effort_rows(output, "Tech Debt", &report.tech_debt_completed)?;
    write_effort_rows(output, "Carry Over", &report.carry_over)?;

    // Hygiene audits
    writeln!(output)?;
    writeln!(output, "Audit,Key,Summary,Assignee")?;
    for row in &report.missing_epic {
        writeln!(
            output,
            "Missing Epic,{},{},{}",
            row.key,
            csv_escape(&row.summary),
            csv_escape(&row.assignee)
        )?;
    }
    for row in &report.missing_effort {
        writeln!(
            output,
            "Missing Estimate,{},{},{}",
            row.key,
            csv_escape(&row.summary),
            csv_escape(&row.assignee)
        )?;
    }

    // Action items
    writeln!(output)?;
    writeln!(output, "Action Item,Key,Summary,Assignee,Status,Age Working Days")?;
    for item in &report.action_items.open {
        writeln!(
            output,
            "Open,{},{},{},{},{}",
            item.key,
            csv_escape(&item.summary),
            csv_escape(&item.assignee),
            csv_escape(&item.status),
            item.age_working_days
        )?;
    }
    for item in &report.action_items.done {
        writeln!(
            output,
            "Done,{},{},{},{},",
            item.key,
            csv_escape(&item.summary),
            csv_escape(&item.assignee),
            csv_escape(&item.status)
        )?;
    }

    // Team roster
    writeln!(output)?;
    writeln!(output, "Team Member")?;
    for name in &report.team {
        writeln!(output, "{}", csv_escape(name))?;
    }

    Ok(())
}
