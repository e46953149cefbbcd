use chrono::{FixedOffset, NaiveDate};

use crate::report::{ActionItems, AgeingRecord, DoneActionItem};

use super::client::JiraClient;
use super::issues::{fetch_epic_issues, fetch_issue_fields, IssueFieldCache};
use super::types::{Issue, IssueFields};
use super::workdays::working_days_since;

const PARENT_FIELDS: [&str; 6] = [
    "status",
    "assignee",
    "issuetype",
    "subtasks",
    "summary",
    "created",
];
const SUBTASK_FIELDS: [&str; 4] = ["status", "assignee", "summary", "created"];

/// Parents must be story-like; "Story" and "Task" are accepted even if
/// the configured allow-list omits them. Sub-tasks bypass this check.
fn is_action_parent(issue: &Issue, story_types: &[String]) -> bool {
    let Some(name) = issue.fields.type_name() else {
        return false;
    };
    name.eq_ignore_ascii_case("story")
        || name.eq_ignore_ascii_case("task")
        || story_types.iter().any(|t| t.eq_ignore_ascii_case(name))
}

/// Collects the cross-sprint action items tracked under one epic.
///
/// Direct children come from the epic walk; their sub-tasks are fetched
/// one by one through the run's field cache. Every failure along the way
/// degrades to fewer rows, never to an error, because this table is
/// supplementary to the sprint metrics themselves.
pub async fn build_action_items(
    client: &JiraClient,
    cache: &mut IssueFieldCache,
    epic_key: &str,
    story_types: &[String],
    tz: FixedOffset,
    today: NaiveDate,
) -> ActionItems {
    let parent_fields: Vec<String> = PARENT_FIELDS.iter().map(ToString::to_string).collect();
    let children = fetch_epic_issues(client, epic_key, &parent_fields).await;

    let mut items: Vec<(String, IssueFields)> = Vec::new();
    let mut subtask_keys: Vec<String> = Vec::new();
    for issue in children {
        if !is_action_parent(&issue, story_types) {
            continue;
        }
        subtask_keys.extend(issue.fields.subtasks.iter().map(|s| s.key.clone()));
        items.push((issue.key, issue.fields));
    }

    let subtask_fields: Vec<String> = SUBTASK_FIELDS.iter().map(ToString::to_string).collect();
    for key in subtask_keys {
        let fields = fetch_issue_fields(client, cache, &key, &subtask_fields).await;
        items.push((key, fields));
    }

    bucket_items(items, tz, today)
}

/// Splits items into open (with working-day ageing) and done rows.
fn bucket_items(items: Vec<(String, IssueFields)>, tz: FixedOffset, today: NaiveDate) -> ActionItems {
    let mut open = Vec::new();
    let mut done = Vec::new();

    for (key, fields) in items {
        let summary = fields.summary_text().to_string();
        let assignee = fields.assignee_display().unwrap_or("-").to_string();
        let status = fields.status_name().to_string();

        if fields.is_done() {
            done.push(DoneActionItem {
                key,
                summary,
                assignee,
                status,
            });
        } else {
            let age_working_days = fields
                .created
                .map(|c| working_days_since(c.with_timezone(&tz).date_naive(), today))
                .unwrap_or(0);
            open.push(AgeingRecord {
                key,
                summary,
                assignee,
                status,
                age_working_days,
            });
        }
    }

    // Oldest open item first; done rows grouped for readability
    open.sort_by(|a, b| b.age_working_days.cmp(&a.age_working_days));
    done.sort_by(|a, b| {
        (a.status.as_str(), a.assignee.as_str(), a.key.as_str()).cmp(&(
            b.status.as_str(),
            b.assignee.as_str(),
            b.key.as_str(),
        ))
    });

    ActionItems { open, done }
}
