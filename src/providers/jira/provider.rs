use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use log::{info, warn};

use crate::config::ReportConfig;
use crate::error::{Result, SprintLensError};
use crate::output::PhaseProgress;
use crate::providers::linearb::series::build_cycle_breakdown;
use crate::providers::linearb::LinearbClient;
use crate::report::{CycleBreakdown, SprintReport, SprintSchedule, SprintSummary, VelocityEntry};

use super::action_items::build_action_items;
use super::audits::{missing_effort_rows, missing_epic_rows, team_roster};
use super::boards::{
    fetch_sprint, fetch_sprint_report, fetch_velocity_chart, find_board, recent_closed_sprints,
    ClosedSprint,
};
use super::burndown::build_burndown;
use super::client::JiraClient;
use super::fields::{discover_fields, FieldSchema};
use super::issues::{fetch_sprint_issues, FetchedIssues, IssueFieldCache};
use super::reconcile::{
    effort_map_from_report, metrics_from_report, reconcile_metrics, velocity_entry, MetricsSource,
};
use super::tables::{carry_over_rows, tech_debt_completed, top_completed};
use super::types::{Sprint, VelocityChart};
use super::workdays::working_days_inclusive;

const DONE_FILTER_JQL: &str = "statusCategory = Done";
const FILTERED_WALK_PAGE_SIZE: usize = 100;
const FILTERED_WALK_MAX_PAGES: usize = 50;
const FULL_WALK_PAGE_SIZE: usize = 200;
const FULL_WALK_MAX_PAGES: usize = 200;

/// Which sprint the report should cover.
#[derive(Debug, Clone)]
pub enum SprintSelection {
    ById(u64),
    ByName(String),
    MostRecent,
}

/// Drives the whole report pipeline against one board.
///
/// The pipeline is strictly sequential: schema discovery feeds every
/// later stage, reconciliation feeds the burndown, and each table
/// builder consumes already-fetched issue sets. Supplementary sources
/// (velocity chart, metrics service) degrade to fallbacks; only the
/// tracker's primary data can abort the run.
pub struct ReportProvider {
    jira: JiraClient,
    linearb: Option<LinearbClient>,
    linearb_team: Option<u64>,
    board_name: String,
    sprint_prefix: Option<String>,
    cfg: ReportConfig,
    tz: FixedOffset,
}

impl ReportProvider {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jira: JiraClient,
        linearb: Option<LinearbClient>,
        linearb_team: Option<u64>,
        board_name: String,
        sprint_prefix: Option<String>,
        cfg: ReportConfig,
        tz: FixedOffset,
    ) -> Self {
        Self {
            jira,
            linearb,
            linearb_team,
            board_name,
            sprint_prefix,
            cfg,
            tz,
        }
    }

    /// Recent closed sprints of the configured board, newest first.
    pub async fn list_sprints(&self, limit: usize) -> Result<Vec<ClosedSprint>> {
        let board = find_board(&self.jira, &self.board_name).await?;
        recent_closed_sprints(&self.jira, board.id, self.sprint_prefix.as_deref(), limit).await
    }

    pub async fn collect_report(&self, selection: &SprintSelection) -> Result<SprintReport> {
        let progress = PhaseProgress::start_phase_1();

        let schema = discover_fields(&self.jira).await?;
        let board = find_board(&self.jira, &self.board_name).await?;
        info!("Using board '{}' (id {})", board.name, board.id);

        let recent = recent_closed_sprints(
            &self.jira,
            board.id,
            self.sprint_prefix.as_deref(),
            self.cfg.velocity_history,
        )
        .await?;
        let sprint = self.select_sprint(&recent, selection).await?;
        info!("Reporting on sprint '{}' (id {})", sprint.name, sprint.id);

        let report_doc = fetch_sprint_report(&self.jira, board.id, sprint.id).await?;
        let chart = match fetch_velocity_chart(&self.jira, board.id).await {
            Ok(chart) => Some(chart),
            Err(e) => {
                warn!("Velocity chart unavailable, falling back to report math: {e}");
                None
            }
        };

        let (metrics, source) = reconcile_metrics(chart.as_ref(), sprint.id, &report_doc);
        match source {
            MetricsSource::VelocityChart => info!("Committed/completed from the velocity chart"),
            MetricsSource::SprintReport => info!("Committed/completed from sprint-report math"),
        }
        let effort_map = effort_map_from_report(&report_doc);

        // The report's own sprint block carries the activation and
        // completion timestamps the listing endpoint omits.
        let sprint_meta = report_doc.sprint.clone().unwrap_or_else(|| sprint.clone());

        let progress = progress.finish_phase_1_start_phase_2();
        let issue_fields = self.issue_field_list(&schema);

        let done_walk = self
            .sprint_walk(
                sprint.id,
                Some(DONE_FILTER_JQL),
                &issue_fields,
                FILTERED_WALK_PAGE_SIZE,
                FILTERED_WALK_MAX_PAGES,
            )
            .await;
        let audit_walk = self
            .sprint_walk(
                sprint.id,
                Some(&self.audit_exclusion_jql()),
                &issue_fields,
                FULL_WALK_PAGE_SIZE,
                FULL_WALK_MAX_PAGES,
            )
            .await;
        let full_walk = self
            .sprint_walk(
                sprint.id,
                None,
                &issue_fields,
                FULL_WALK_PAGE_SIZE,
                FULL_WALK_MAX_PAGES,
            )
            .await;

        let progress = progress.finish_phase_2_start_phase_3();
        let today = Utc::now().with_timezone(&self.tz).date_naive();

        let top_completed = top_completed(
            &done_walk.issues,
            done_walk.server_filtered,
            &schema,
            &effort_map,
            &self.cfg.story_types,
            self.cfg.top_completed_limit,
            self.cfg.summary_max_chars,
        );
        let tech_debt_completed = match &self.cfg.tech_debt_epic {
            Some(epic) => tech_debt_completed(
                &done_walk.issues,
                done_walk.server_filtered,
                &schema,
                &effort_map,
                epic,
                &self.cfg.excluded_statuses,
                self.cfg.summary_max_chars,
            ),
            None => Vec::new(),
        };
        let carry_over = carry_over_rows(
            &report_doc,
            &full_walk.issues,
            &schema,
            &effort_map,
            self.cfg.summary_max_chars,
        );
        let missing_epic = missing_epic_rows(
            &audit_walk.issues,
            audit_walk.server_filtered,
            &schema,
            &self.cfg.story_types,
            &self.cfg.excluded_statuses,
        );
        let missing_effort = missing_effort_rows(
            &audit_walk.issues,
            audit_walk.server_filtered,
            &schema,
            &self.cfg.story_types,
            &self.cfg.excluded_statuses,
        );
        let team = team_roster(&full_walk.issues, &self.cfg.bot_assignee_pattern);

        let burndown = build_burndown(
            &sprint_meta,
            metrics.committed,
            &full_walk.issues,
            &schema,
            self.tz,
            today,
        );

        let action_items = match &self.cfg.action_items_epic {
            Some(epic) => {
                let mut cache = IssueFieldCache::new();
                build_action_items(
                    &self.jira,
                    &mut cache,
                    epic,
                    &self.cfg.story_types,
                    self.tz,
                    today,
                )
                .await
            }
            None => Default::default(),
        };

        let velocity_history = self
            .build_velocity_history(board.id, &recent, chart.as_ref(), &sprint)
            .await;

        let progress = progress.finish_phase_3_start_phase_4();
        let cycle_time = self.fetch_cycle_breakdown(&sprint_meta, today).await;
        progress.finish_phase_4();

        Ok(SprintReport {
            board: board.name,
            sprint: SprintSummary {
                id: sprint.id,
                name: sprint.name.clone(),
                state: sprint.state.clone(),
            },
            generated_at: Utc::now(),
            schedule: self.build_schedule(&sprint_meta),
            metrics,
            velocity_history,
            burndown,
            cycle_time,
            top_completed,
            tech_debt_completed,
            carry_over,
            missing_epic,
            missing_effort,
            action_items,
            team,
        })
    }

    async fn select_sprint(
        &self,
        recent: &[ClosedSprint],
        selection: &SprintSelection,
    ) -> Result<Sprint> {
        match selection {
            SprintSelection::ById(id) => {
                if let Some(found) = recent.iter().find(|c| c.sprint.id == *id) {
                    return Ok(found.sprint.clone());
                }
                // Outside the recent window; ask the tracker directly
                fetch_sprint(&self.jira, *id)
                    .await
                    .map_err(|_| SprintLensError::SprintNotFound(id.to_string()))
            }
            SprintSelection::ByName(name) => recent
                .iter()
                .find(|c| c.sprint.name == *name)
                .map(|c| c.sprint.clone())
                .ok_or_else(|| SprintLensError::SprintNotFound(name.clone())),
            SprintSelection::MostRecent => recent
                .first()
                .map(|c| c.sprint.clone())
                .ok_or_else(|| SprintLensError::SprintNotFound("most recent".to_string())),
        }
    }

    /// Fields requested on every sprint issue walk: the typed fields the
    /// builders read plus the discovered custom fields.
    fn issue_field_list(&self, schema: &FieldSchema) -> Vec<String> {
        let mut fields: Vec<String> = ["summary", "issuetype", "status", "assignee", "resolutiondate"]
            .iter()
            .map(ToString::to_string)
            .collect();
        fields.push(schema.epic_link_field.clone());
        fields.extend(schema.effort_fields.iter().cloned());
        fields
    }

    fn audit_exclusion_jql(&self) -> String {
        let quoted: Vec<String> = self
            .cfg
            .excluded_statuses
            .iter()
            .map(|s| format!("\"{s}\""))
            .collect();
        format!("status not in ({})", quoted.join(", "))
    }

    /// One sprint walk, degraded to an empty unfiltered result on
    /// failure so a single broken listing cannot take down the other
    /// builders.
    async fn sprint_walk(
        &self,
        sprint_id: u64,
        jql: Option<&str>,
        fields: &[String],
        page_size: usize,
        max_pages: usize,
    ) -> FetchedIssues {
        match fetch_sprint_issues(&self.jira, sprint_id, jql, fields, page_size, max_pages).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("Issue walk for sprint {sprint_id} failed, continuing without it: {e}");
                FetchedIssues {
                    issues: Vec::new(),
                    server_filtered: false,
                }
            }
        }
    }

    /// Committed/completed per recent sprint, oldest first, with the
    /// sprint under review flagged. Sprints the velocity chart misses
    /// are backfilled from their own report math.
    async fn build_velocity_history(
        &self,
        board_id: u64,
        recent: &[ClosedSprint],
        chart: Option<&VelocityChart>,
        current: &Sprint,
    ) -> Vec<VelocityEntry> {
        let mut window: Vec<(u64, String)> = recent
            .iter()
            .rev()
            .map(|c| (c.sprint.id, c.sprint.name.clone()))
            .collect();
        if !window.iter().any(|(id, _)| *id == current.id) {
            window.push((current.id, current.name.clone()));
        }

        let mut history = Vec::with_capacity(window.len());
        for (sprint_id, name) in window {
            let numbers = match chart.and_then(|c| velocity_entry(c, sprint_id)) {
                Some(entry) => Some((
                    entry.estimated.as_ref().and_then(|s| s.value).unwrap_or(0.0),
                    entry.completed.as_ref().and_then(|s| s.value).unwrap_or(0.0),
                )),
                None => match fetch_sprint_report(&self.jira, board_id, sprint_id).await {
                    Ok(doc) => {
                        let fallback = metrics_from_report(&doc);
                        Some((fallback.committed, fallback.completed))
                    }
                    Err(e) => {
                        warn!("Velocity backfill failed for sprint {sprint_id}: {e}");
                        None
                    }
                },
            };

            if let Some((committed, completed)) = numbers {
                history.push(VelocityEntry {
                    sprint_id,
                    name,
                    committed,
                    completed,
                    is_current: sprint_id == current.id,
                });
            }
        }
        history
    }

    fn build_schedule(&self, sprint_meta: &Sprint) -> SprintSchedule {
        let in_tz =
            |d: Option<DateTime<FixedOffset>>| d.map(|d| d.with_timezone(&self.tz));

        let planned_start = in_tz(sprint_meta.start_date);
        let planned_end = in_tz(sprint_meta.end_date);
        let actual_start = in_tz(sprint_meta.activated_date).or(planned_start);
        let actual_end = in_tz(sprint_meta.complete_date).or(planned_end);

        let span_days = |start: Option<DateTime<FixedOffset>>,
                         end: Option<DateTime<FixedOffset>>| {
            match (start, end) {
                (Some(start), Some(end)) => {
                    working_days_inclusive(start.date_naive(), end.date_naive())
                }
                _ => 0,
            }
        };

        SprintSchedule {
            planned_start,
            planned_end,
            actual_start,
            actual_end,
            planned_working_days: span_days(planned_start, planned_end),
            actual_working_days: span_days(actual_start, actual_end),
        }
    }

    /// Engineering-metrics day series for the sprint's planned window.
    /// Missing token, missing team id, "no data", and request failures
    /// all degrade to empty series.
    async fn fetch_cycle_breakdown(
        &self,
        sprint_meta: &Sprint,
        today: NaiveDate,
    ) -> CycleBreakdown {
        let (Some(client), Some(team_id)) = (self.linearb.as_ref(), self.linearb_team) else {
            info!("Engineering-metrics access not configured; skipping cycle-time series");
            return CycleBreakdown::default();
        };

        let start = sprint_meta
            .start_date
            .map(|d| d.with_timezone(&self.tz).date_naive())
            .unwrap_or(today);
        let end = sprint_meta
            .end_date
            .map(|d| d.with_timezone(&self.tz).date_naive())
            .unwrap_or(start)
            .max(start);

        match client.fetch_daily_measurements(team_id, start, end).await {
            Ok(rows) => {
                if rows.is_empty() {
                    info!("Engineering-metrics service reported no data for the sprint window");
                }
                build_cycle_breakdown(&rows, start, end)
            }
            Err(e) => {
                warn!("Engineering-metrics query failed, series left empty: {e}");
                build_cycle_breakdown(&[], start, end)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Token;
    use mockito::Matcher;

    fn provider(server: &mockito::Server) -> ReportProvider {
        let jira = JiraClient::new(&server.url(), None, Some(Token::from("t"))).unwrap();
        ReportProvider::new(
            jira,
            None,
            None,
            "GVRE Board".to_string(),
            Some("GVRE".to_string()),
            ReportConfig::default(),
            FixedOffset::east_opt(5 * 3600 + 30 * 60).unwrap(),
        )
    }

    fn mock_core_endpoints(server: &mut mockito::Server) {
        server
            .mock("GET", "/rest/api/2/field")
            .with_body(
                serde_json::json!([
                    {"id": "customfield_10020", "name": "Epic Link", "schema": {"type": "any"}},
                    {"id": "customfield_10016", "name": "Story Points", "schema": {"type": "number"}},
                ])
                .to_string(),
            )
            .create();
        server
            .mock("GET", "/rest/agile/1.0/board")
            .match_query(Matcher::Any)
            .with_body(
                serde_json::json!({"values": [{"id": 3, "name": "GVRE Board"}]}).to_string(),
            )
            .create();
        server
            .mock("GET", "/rest/agile/1.0/board/3/sprint")
            .match_query(Matcher::Any)
            .with_body(
                serde_json::json!({
                    "values": [{
                        "id": 77, "name": "GVRE Sprint 18", "state": "closed",
                        "startDate": "2024-03-04T09:00:00.000+0530",
                        "endDate": "2024-03-13T18:00:00.000+0530",
                    }]
                })
                .to_string(),
            )
            .create();
        server
            .mock("GET", "/rest/greenhopper/1.0/rapid/charts/sprintreport")
            .match_query(Matcher::Any)
            .with_body(
                serde_json::json!({
                    "sprint": {
                        "id": 77, "name": "GVRE Sprint 18", "state": "closed",
                        "startDate": "2024-03-04T09:00:00.000+0530",
                        "endDate": "2024-03-13T18:00:00.000+0530",
                        "completeDate": "2024-03-13T18:30:00.000+0530",
                    },
                    "contents": {
                        "completedIssues": [
                            {"key": "GV-1", "estimateStatistic": {"statFieldValue": {"value": 20.0}}},
                            {"key": "GV-2", "estimateStatistic": {"statFieldValue": {"value": 15.0}}},
                        ],
                        "issuesNotCompletedInCurrentSprint": [
                            {"key": "GV-3", "estimateStatistic": {"statFieldValue": {"value": 15.0}}},
                        ],
                        "issueKeysAddedDuringSprint": {},
                    }
                })
                .to_string(),
            )
            .create();
        let all_issues_body = serde_json::json!({
            "issues": [
                {"key": "GV-1", "fields": {
                    "summary": "Voucher issuance flow",
                    "issuetype": {"name": "Story"},
                    "status": {"name": "Done", "statusCategory": {"key": "done"}},
                    "assignee": {"accountId": "a1", "displayName": "Priya Nair"},
                    "resolutiondate": "2024-03-05T11:00:00.000+0530",
                    "customfield_10016": 20.0,
                    "customfield_10020": "GV-2000",
                }},
                {"key": "GV-2", "fields": {
                    "summary": "Redemption edge cases",
                    "issuetype": {"name": "Task"},
                    "status": {"name": "Done", "statusCategory": {"key": "done"}},
                    "assignee": {"accountId": "a2", "displayName": "Arun Menon"},
                    "resolutiondate": "2024-03-08T16:00:00.000+0530",
                    "customfield_10016": 15.0,
                    "customfield_10020": "GV-2000",
                }},
                {"key": "GV-3", "fields": {
                    "summary": "Carried over work",
                    "issuetype": {"name": "Story"},
                    "status": {"name": "In Progress",
                               "statusCategory": {"key": "indeterminate"}},
                    "assignee": {"accountId": "a1", "displayName": "Priya Nair"},
                    "customfield_10016": 15.0,
                }},
            ]
        })
        .to_string();
        // Unfiltered walk: `jql` is always the last query parameter when
        // present, so this matches only requests without one
        server
            .mock("GET", "/rest/agile/1.0/sprint/77/issue")
            .match_query(Matcher::Regex("fields=[^&]*$".to_string()))
            .with_body(&all_issues_body)
            .create();
        // The status-exclusion walk; nothing in the fixture is cancelled
        server
            .mock("GET", "/rest/agile/1.0/sprint/77/issue")
            .match_query(Matcher::UrlEncoded(
                "jql".into(),
                "status not in (\"Cancelled\", \"Canceled\", \"Not Needed\")".into(),
            ))
            .with_body(&all_issues_body)
            .create();
        server
            .mock("GET", "/rest/agile/1.0/sprint/77/issue")
            .match_query(Matcher::UrlEncoded(
                "jql".into(),
                "statusCategory = Done".into(),
            ))
            .with_body(
                serde_json::json!({
                    "issues": [
                        {"key": "GV-1", "fields": {
                            "summary": "Voucher issuance flow",
                            "issuetype": {"name": "Story"},
                            "status": {"name": "Done", "statusCategory": {"key": "done"}},
                            "customfield_10016": 20.0,
                        }},
                        {"key": "GV-2", "fields": {
                            "summary": "Redemption edge cases",
                            "issuetype": {"name": "Task"},
                            "status": {"name": "Done", "statusCategory": {"key": "done"}},
                            "customfield_10016": 15.0,
                        }},
                    ]
                })
                .to_string(),
            )
            .create();
    }

    #[tokio::test]
    async fn test_collect_report_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        mock_core_endpoints(&mut server);
        server
            .mock("GET", "/rest/greenhopper/1.0/rapid/charts/velocity")
            .match_query(Matcher::Any)
            .with_body(
                serde_json::json!({
                    "velocityStatEntries": {
                        "77": {"estimated": {"value": 50.0}, "completed": {"value": 35.0}}
                    }
                })
                .to_string(),
            )
            .create();

        let report = provider(&server)
            .collect_report(&SprintSelection::MostRecent)
            .await
            .unwrap();

        assert_eq!(report.board, "GVRE Board");
        assert_eq!(report.sprint.name, "GVRE Sprint 18");
        assert_eq!(report.metrics.committed, 50.0);
        assert_eq!(report.metrics.completed, 35.0);
        assert_eq!(report.metrics.carry_over_count, 1);
        assert_eq!(report.metrics.scope_change_count, 0);

        // Burndown: 50 → 30 on day 2 → 15 on day 5 → 15 through the end
        assert_eq!(report.burndown.remaining[0], 50.0);
        assert_eq!(report.burndown.remaining[1], 30.0);
        assert_eq!(report.burndown.remaining[4], 15.0);
        assert_eq!(*report.burndown.remaining.last().unwrap(), 15.0);

        assert_eq!(report.top_completed.len(), 2);
        assert_eq!(report.top_completed[0].key, "GV-1");
        assert_eq!(report.carry_over.len(), 1);
        assert_eq!(report.carry_over[0].key, "GV-3");
        assert_eq!(report.team, vec!["Arun Menon", "Priya Nair"]);

        assert_eq!(report.velocity_history.len(), 1);
        assert!(report.velocity_history[0].is_current);

        // No metrics service configured: series stay empty
        assert!(report.cycle_time.cycle.dates.is_empty());

        assert_eq!(report.schedule.planned_working_days, 8);
    }

    #[tokio::test]
    async fn test_collect_report_falls_back_when_velocity_misses_sprint() {
        let mut server = mockito::Server::new_async().await;
        mock_core_endpoints(&mut server);
        server
            .mock("GET", "/rest/greenhopper/1.0/rapid/charts/velocity")
            .match_query(Matcher::Any)
            .with_body(
                serde_json::json!({
                    "velocityStatEntries": {
                        "999": {"estimated": {"value": 1.0}, "completed": {"value": 1.0}}
                    }
                })
                .to_string(),
            )
            .create();

        let report = provider(&server)
            .collect_report(&SprintSelection::MostRecent)
            .await
            .unwrap();

        // Report math: committed 20+15+15, completed 20+15
        assert_eq!(report.metrics.committed, 50.0);
        assert_eq!(report.metrics.completed, 35.0);
        assert_eq!(report.metrics.carry_over_count, 1);
    }

    #[tokio::test]
    async fn test_select_sprint_by_unknown_name_fails() {
        let mut server = mockito::Server::new_async().await;
        mock_core_endpoints(&mut server);
        server
            .mock("GET", "/rest/greenhopper/1.0/rapid/charts/velocity")
            .match_query(Matcher::Any)
            .with_body(serde_json::json!({"velocityStatEntries": {}}).to_string())
            .create();

        let result = provider(&server)
            .collect_report(&SprintSelection::ByName("No Such Sprint".to_string()))
            .await;

        assert!(matches!(result, Err(SprintLensError::SprintNotFound(_))));
    }
}
