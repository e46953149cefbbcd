use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{Result, SprintLensError};

use super::client::JiraClient;
use super::types::{Board, BoardPage, Sprint, SprintPage, SprintReportDoc, VelocityChart};

const PAGE_SIZE: usize = 50;

/// A closed sprint together with the completion timestamp used for
/// ordering. The timestamp comes from the sprint's own report when
/// available; sprints whose report cannot be fetched sort as undated.
#[derive(Debug, Clone)]
pub struct ClosedSprint {
    pub sprint: Sprint,
    pub completed_at: Option<DateTime<FixedOffset>>,
}

/// Finds a scrum board by name: exact match first, then an unambiguous
/// case-insensitive containment match.
pub async fn find_board(client: &JiraClient, name: &str) -> Result<Board> {
    let boards = list_scrum_boards(client).await?;

    if let Some(board) = boards.iter().find(|b| b.name == name) {
        return Ok(board.clone());
    }

    let needle = name.to_lowercase();
    let matches: Vec<&Board> = boards
        .iter()
        .filter(|b| b.name.to_lowercase().contains(&needle))
        .collect();

    match matches.as_slice() {
        [board] => Ok((*board).clone()),
        [] => Err(SprintLensError::BoardNotFound(name.to_string())),
        many => Err(SprintLensError::AmbiguousBoard {
            name: name.to_string(),
            candidates: many
                .iter()
                .map(|b| b.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

async fn list_scrum_boards(client: &JiraClient) -> Result<Vec<Board>> {
    let mut boards = Vec::new();
    let mut start_at = 0usize;

    loop {
        let raw = client
            .get_json(
                "rest/agile/1.0/board",
                &[
                    ("type", "scrum".to_string()),
                    ("startAt", start_at.to_string()),
                    ("maxResults", PAGE_SIZE.to_string()),
                ],
            )
            .await?;
        let page: BoardPage = serde_json::from_value(raw)?;

        let count = page.values.len();
        debug!("Fetched {count} board(s) at offset {start_at}");
        boards.extend(page.values);

        if count < PAGE_SIZE {
            break;
        }
        start_at += count;
    }

    Ok(boards)
}

/// All closed sprints of a board, deduplicated by id in listing order.
pub async fn list_closed_sprints(client: &JiraClient, board_id: u64) -> Result<Vec<Sprint>> {
    let mut seen: IndexMap<u64, Sprint> = IndexMap::new();
    let mut start_at = 0usize;

    loop {
        let raw = client
            .get_json(
                &format!("rest/agile/1.0/board/{board_id}/sprint"),
                &[
                    ("state", "closed".to_string()),
                    ("startAt", start_at.to_string()),
                    ("maxResults", PAGE_SIZE.to_string()),
                ],
            )
            .await?;
        let page: SprintPage = serde_json::from_value(raw)?;

        let count = page.values.len();
        debug!("Fetched {count} closed sprint(s) at offset {start_at}");
        for sprint in page.values {
            seen.entry(sprint.id).or_insert(sprint);
        }

        if count < PAGE_SIZE {
            break;
        }
        start_at += count;
    }

    Ok(seen.into_values().collect())
}

/// Closed sprints matching the configured prefix, most recently
/// completed first, truncated to `limit`.
///
/// QA hardening sprints are excluded by name. Each candidate's
/// completion timestamp is read from its sprint report, preferring the
/// report's own completion date over the planned end date.
pub async fn recent_closed_sprints(
    client: &JiraClient,
    board_id: u64,
    prefix: Option<&str>,
    limit: usize,
) -> Result<Vec<ClosedSprint>> {
    let all_closed = list_closed_sprints(client, board_id).await?;

    let mut enriched = Vec::new();
    for sprint in all_closed {
        if let Some(prefix) = prefix {
            if !sprint.name.starts_with(prefix) {
                continue;
            }
        }
        if sprint.name.to_uppercase().contains("QA") {
            continue;
        }

        let completed_at = match fetch_sprint_report(client, board_id, sprint.id).await {
            Ok(report) => {
                let meta = report.sprint.as_ref();
                meta.and_then(|m| m.complete_date)
                    .or_else(|| meta.and_then(|m| m.end_date))
                    .or(sprint.end_date)
                    .or(sprint.complete_date)
            }
            Err(e) => {
                warn!(
                    "Could not enrich sprint {} ({}) with its completion date: {e}",
                    sprint.id, sprint.name
                );
                None
            }
        };

        enriched.push(ClosedSprint {
            sprint,
            completed_at,
        });
    }

    if enriched.is_empty() {
        return Err(SprintLensError::NoSprintsFound {
            board_id,
            prefix: prefix.unwrap_or("").to_string(),
        });
    }

    // Dated sprints first, newest completion first, then undated by id
    enriched.sort_by(|a, b| {
        (b.completed_at, b.sprint.id).cmp(&(a.completed_at, a.sprint.id))
    });
    enriched.truncate(limit);

    Ok(enriched)
}

/// Fetches the sprint report document for one sprint of a board.
pub async fn fetch_sprint_report(
    client: &JiraClient,
    board_id: u64,
    sprint_id: u64,
) -> Result<SprintReportDoc> {
    let raw = client
        .get_json(
            "rest/greenhopper/1.0/rapid/charts/sprintreport",
            &[
                ("rapidViewId", board_id.to_string()),
                ("sprintId", sprint_id.to_string()),
            ],
        )
        .await?;
    Ok(serde_json::from_value(raw)?)
}

/// Fetches the velocity chart for a board; entries are keyed by sprint id.
pub async fn fetch_velocity_chart(client: &JiraClient, board_id: u64) -> Result<VelocityChart> {
    let raw = client
        .get_json(
            "rest/greenhopper/1.0/rapid/charts/velocity",
            &[("rapidViewId", board_id.to_string())],
        )
        .await?;
    Ok(serde_json::from_value(raw)?)
}

/// Fetches a single sprint by id, used when a requested sprint falls
/// outside the recent-closed window.
pub async fn fetch_sprint(client: &JiraClient, sprint_id: u64) -> Result<Sprint> {
    let raw = client
        .get_json(&format!("rest/agile/1.0/sprint/{sprint_id}"), &[])
        .await?;
    Ok(serde_json::from_value(raw)?)
}
