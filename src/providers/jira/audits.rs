use regex::RegexBuilder;

use crate::report::AuditRow;

use super::fields::FieldSchema;
use super::tables::{is_excluded_status, is_story_like};
use super::types::Issue;

/// Backlog-hygiene audits over one sprint's story-like items.
///
/// Both audits scan the same scope: story-like issues that are not in a
/// terminal-but-not-delivered status. The walker filters those statuses
/// server-side when it can; the exclusion is re-applied here whenever it
/// could not.
fn audit_scope<'a>(
    issues: &'a [Issue],
    server_filtered: bool,
    story_types: &[String],
    excluded: &[String],
) -> impl Iterator<Item = &'a Issue> + 'a {
    let story_types = story_types.to_vec();
    let excluded = excluded.to_vec();
    issues
        .iter()
        .filter(move |i| is_story_like(i, &story_types))
        .filter(move |i| server_filtered || !is_excluded_status(i.fields.status_name(), &excluded))
}

fn audit_row(issue: &Issue) -> AuditRow {
    AuditRow {
        key: issue.key.clone(),
        summary: issue.fields.summary_text().to_string(),
        assignee: issue
            .fields
            .assignee_display()
            .unwrap_or("-")
            .to_string(),
    }
}

/// Story-like items with no epic link.
pub fn missing_epic_rows(
    issues: &[Issue],
    server_filtered: bool,
    schema: &FieldSchema,
    story_types: &[String],
    excluded: &[String],
) -> Vec<AuditRow> {
    let mut rows: Vec<AuditRow> = audit_scope(issues, server_filtered, story_types, excluded)
        .filter(|i| schema.epic_key_of(&i.fields).is_none())
        .map(audit_row)
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}

/// Story-like items with no estimate in any discovered field, or whose
/// present estimates sum to zero. The two cases are one audit: either
/// way the item needs estimating.
pub fn missing_effort_rows(
    issues: &[Issue],
    server_filtered: bool,
    schema: &FieldSchema,
    story_types: &[String],
    excluded: &[String],
) -> Vec<AuditRow> {
    let mut rows: Vec<AuditRow> = audit_scope(issues, server_filtered, story_types, excluded)
        .filter(|i| {
            let values = schema.present_effort_values(&i.fields);
            values.is_empty() || values.iter().sum::<f64>() == 0.0
        })
        .map(audit_row)
        .collect();
    rows.sort_by(|a, b| a.key.cmp(&b.key));
    rows
}

/// Unique assignee display names across the sprint's issues, sorted.
///
/// People are keyed by account id so the same person under two display
/// spellings appears once. Bot and service accounts are dropped when the
/// configured pattern matches their display name or email.
pub fn team_roster(issues: &[Issue], bot_pattern: &str) -> Vec<String> {
    let bot_regex = RegexBuilder::new(bot_pattern)
        .case_insensitive(true)
        .build()
        .ok();

    let mut seen = std::collections::HashSet::new();
    let mut names = Vec::new();
    for issue in issues {
        let Some(person) = issue.fields.assignee.as_ref() else {
            continue;
        };
        let Some(display) = issue.fields.assignee_display() else {
            continue;
        };
        let account = person
            .account_id
            .as_deref()
            .or(person.name.as_deref())
            .or(person.email_address.as_deref())
            .unwrap_or(display);

        if let Some(regex) = &bot_regex {
            let email = person.email_address.as_deref().unwrap_or("");
            if regex.is_match(display) || (!email.is_empty() && regex.is_match(email)) {
                continue;
            }
        }
        if seen.insert(account.to_string()) {
            names.push(display.to_string());
        }
    }

    names.sort();
    names
}
