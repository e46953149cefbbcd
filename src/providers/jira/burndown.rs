use chrono::{Days, FixedOffset, NaiveDate};

use crate::report::BurndownSeries;

use super::fields::FieldSchema;
use super::types::{Issue, Sprint};

const DEFAULT_SPRINT_LENGTH_DAYS: u64 = 14;

/// Builds the burndown series for a sprint.
///
/// One bucket per calendar day from the sprint's start date to its
/// actual completion date, falling back to the planned end date. Each
/// issue resolved inside that range contributes its estimate to that
/// day's "done" bucket; remaining effort is committed minus cumulative
/// done, clamped at zero. The ideal line descends linearly from
/// committed to zero over the same axis.
pub fn build_burndown(
    sprint: &Sprint,
    committed: f64,
    issues: &[Issue],
    schema: &FieldSchema,
    tz: FixedOffset,
    fallback_start: NaiveDate,
) -> BurndownSeries {
    let start = sprint
        .start_date
        .or(sprint.activated_date)
        .map(|d| d.with_timezone(&tz).date_naive())
        .unwrap_or(fallback_start);
    let end = sprint
        .complete_date
        .or(sprint.end_date)
        .map(|d| d.with_timezone(&tz).date_naive())
        .unwrap_or_else(|| start + Days::new(DEFAULT_SPRINT_LENGTH_DAYS))
        .max(start);

    let dates: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();

    let mut done_by_day = vec![0.0f64; dates.len()];
    for issue in issues {
        let Some(resolved) = issue.fields.resolutiondate else {
            continue;
        };
        let day = resolved.with_timezone(&tz).date_naive();
        if day < start || day > end {
            continue;
        }
        let index = (day - start).num_days() as usize;
        done_by_day[index] += schema.effort_of(&issue.fields).unwrap_or(0.0);
    }

    let mut remaining = Vec::with_capacity(dates.len());
    let mut cumulative = 0.0;
    for done in &done_by_day {
        cumulative += done;
        remaining.push((committed - cumulative).max(0.0));
    }

    let total_days = (end - start).num_days().max(1) as f64;
    let ideal = (0..dates.len())
        .map(|i| committed * (1.0 - i as f64 / total_days))
        .collect();

    BurndownSeries {
        dates,
        ideal,
        remaining,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ist() -> FixedOffset {
        FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap()
    }

    fn schema() -> FieldSchema {
        FieldSchema {
            epic_link_field: "customfield_10020".to_string(),
            effort_fields: vec!["customfield_10016".to_string()],
        }
    }

    fn sprint(start: &str, end: &str) -> Sprint {
        serde_json::from_value(serde_json::json!({
            "id": 77,
            "name": "GVRE Sprint 18",
            "state": "closed",
            "startDate": start,
            "endDate": end,
        }))
        .unwrap()
    }

    fn resolved_issue(key: &str, effort: f64, resolved: &str) -> Issue {
        serde_json::from_value(serde_json::json!({
            "key": key,
            "fields": {
                "customfield_10016": effort,
                "resolutiondate": resolved,
            }
        }))
        .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
    }

    #[test]
    fn test_burndown_fifty_point_scenario() {
        // Ten-day sprint, 50 committed; 20 done on day 2, 15 on day 5,
        // one 15-point item never resolved
        let sprint = sprint("2024-03-04T09:00:00.000+0530", "2024-03-13T18:00:00.000+0530");
        let issues = vec![
            resolved_issue("GV-1", 20.0, "2024-03-05T11:00:00.000+0530"),
            resolved_issue("GV-2", 15.0, "2024-03-08T16:00:00.000+0530"),
        ];

        let series = build_burndown(&sprint, 50.0, &issues, &schema(), ist(), today());

        assert_eq!(series.dates.len(), 10);
        assert_eq!(series.remaining[0], 50.0);
        assert_eq!(series.remaining[1], 30.0);
        assert_eq!(series.remaining[4], 15.0);
        assert_eq!(series.remaining[9], 15.0);
        assert_eq!(series.ideal[0], 50.0);
        assert!((series.ideal[9] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_burndown_remaining_never_increases() {
        let sprint = sprint("2024-03-04T09:00:00.000+0530", "2024-03-13T18:00:00.000+0530");
        let issues = vec![
            resolved_issue("GV-1", 8.0, "2024-03-06T11:00:00.000+0530"),
            resolved_issue("GV-2", 5.0, "2024-03-06T15:00:00.000+0530"),
            resolved_issue("GV-3", 3.0, "2024-03-11T10:00:00.000+0530"),
        ];

        let series = build_burndown(&sprint, 20.0, &issues, &schema(), ist(), today());

        for pair in series.remaining.windows(2) {
            assert!(pair[1] <= pair[0]);
        }
        assert!(series.remaining.iter().all(|r| *r >= 0.0));
    }

    #[test]
    fn test_burndown_clamps_overdelivery_at_zero() {
        let sprint = sprint("2024-03-04T09:00:00.000+0530", "2024-03-08T18:00:00.000+0530");
        let issues = vec![resolved_issue("GV-1", 30.0, "2024-03-05T11:00:00.000+0530")];

        let series = build_burndown(&sprint, 10.0, &issues, &schema(), ist(), today());

        assert_eq!(series.remaining[1], 0.0);
        assert_eq!(series.remaining[4], 0.0);
    }

    #[test]
    fn test_burndown_prefers_actual_completion_date() {
        // Sprint closed two days late; the axis follows completeDate
        let mut sprint = sprint("2024-03-04T09:00:00.000+0530", "2024-03-13T18:00:00.000+0530");
        sprint.complete_date =
            Some("2024-03-15T18:00:00+05:30".parse().unwrap());

        let series = build_burndown(&sprint, 10.0, &[], &schema(), ist(), today());

        assert_eq!(series.dates.len(), 12);
    }

    #[test]
    fn test_burndown_ignores_out_of_range_resolutions() {
        let sprint = sprint("2024-03-04T09:00:00.000+0530", "2024-03-08T18:00:00.000+0530");
        let issues = vec![resolved_issue("GV-1", 5.0, "2024-02-20T11:00:00.000+0530")];

        let series = build_burndown(&sprint, 10.0, &issues, &schema(), ist(), today());

        assert!(series.remaining.iter().all(|r| (*r - 10.0).abs() < 1e-9));
    }

    #[test]
    fn test_burndown_dateless_sprint_uses_default_span() {
        let sprint: Sprint = serde_json::from_value(serde_json::json!({
            "id": 1, "name": "Undated", "state": "closed",
        }))
        .unwrap();

        let series = build_burndown(&sprint, 10.0, &[], &schema(), ist(), today());

        assert_eq!(series.dates[0], today());
        assert_eq!(series.dates.len(), 15);
    }

    #[test]
    fn test_burndown_axes_share_length() {
        let sprint = sprint("2024-03-04T09:00:00.000+0530", "2024-03-13T18:00:00.000+0530");
        let series = build_burndown(&sprint, 25.0, &[], &schema(), ist(), today());

        assert_eq!(series.dates.len(), series.ideal.len());
        assert_eq!(series.dates.len(), series.remaining.len());
        for pair in series.dates.windows(2) {
            assert_eq!(pair[1], pair[0] + Days::new(1));
        }
    }
}
