use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::Result;

use super::client::JiraClient;
use super::types::{Issue, IssueDetail, IssueFields, IssuePage};

/// Issues collected by a sprint walk, with the flag telling callers
/// whether the status filter was applied server-side. When it is
/// `false` the caller must re-apply its predicate client-side.
#[derive(Debug)]
pub struct FetchedIssues {
    pub issues: Vec<Issue>,
    pub server_filtered: bool,
}

/// Walks a sprint's issues page by page.
///
/// When a JQL fragment is given and the filtered walk fails for any
/// reason, the walk is retried once without the filter; the result then
/// reports `server_filtered = false`. Overlapping pages are collapsed by
/// issue key, keeping first-seen order.
pub async fn fetch_sprint_issues(
    client: &JiraClient,
    sprint_id: u64,
    jql: Option<&str>,
    fields: &[String],
    page_size: usize,
    max_pages: usize,
) -> Result<FetchedIssues> {
    match walk_sprint_issues(client, sprint_id, jql, fields, page_size, max_pages).await {
        Ok(issues) => Ok(FetchedIssues {
            issues: dedupe_by_key(issues),
            server_filtered: jql.is_some(),
        }),
        Err(e) if jql.is_some() => {
            warn!(
                "Filtered issue fetch for sprint {sprint_id} failed ({e}), \
                 refetching without the filter"
            );
            let issues =
                walk_sprint_issues(client, sprint_id, None, fields, page_size, max_pages).await?;
            Ok(FetchedIssues {
                issues: dedupe_by_key(issues),
                server_filtered: false,
            })
        }
        Err(e) => Err(e),
    }
}

async fn walk_sprint_issues(
    client: &JiraClient,
    sprint_id: u64,
    jql: Option<&str>,
    fields: &[String],
    page_size: usize,
    max_pages: usize,
) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();
    let mut start_at = 0usize;

    for _ in 0..max_pages {
        let mut query = vec![
            ("startAt", start_at.to_string()),
            ("maxResults", page_size.to_string()),
            ("fields", fields.join(",")),
        ];
        if let Some(jql) = jql {
            query.push(("jql", jql.to_string()));
        }

        let raw = client
            .get_json(&format!("rest/agile/1.0/sprint/{sprint_id}/issue"), &query)
            .await?;
        let page: IssuePage = serde_json::from_value(raw)?;

        let count = page.issues.len();
        debug!("Sprint {sprint_id}: {count} issue(s) at offset {start_at}");
        issues.extend(page.issues);

        if count < page_size {
            break;
        }
        start_at += count;
    }

    Ok(issues)
}

fn dedupe_by_key(issues: Vec<Issue>) -> Vec<Issue> {
    let mut unique: IndexMap<String, Issue> = IndexMap::with_capacity(issues.len());
    for issue in issues {
        unique.entry(issue.key.clone()).or_insert(issue);
    }
    unique.into_values().collect()
}

/// Direct children of an epic.
///
/// Tries the agile epic endpoint first, keeping whatever pages arrived
/// if a later page fails. Falls back to a JQL search only when the
/// agile walk yielded nothing. Both paths degrading leaves the list
/// empty; callers treat that as "no action items", not as a failure.
pub async fn fetch_epic_issues(
    client: &JiraClient,
    epic_key: &str,
    fields: &[String],
) -> Vec<Issue> {
    const PAGE_SIZE: usize = 100;

    let mut issues = Vec::new();
    let mut start_at = 0usize;
    loop {
        let query = [
            ("startAt", start_at.to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
            ("fields", fields.join(",")),
        ];
        let page: IssuePage = match client
            .get_json(&format!("rest/agile/1.0/epic/{epic_key}/issue"), &query)
            .await
            .and_then(|raw| Ok(serde_json::from_value(raw)?))
        {
            Ok(page) => page,
            Err(e) => {
                warn!("Epic issues via agile endpoint failed for {epic_key}: {e}");
                break;
            }
        };

        let count = page.issues.len();
        issues.extend(page.issues);
        if count < PAGE_SIZE {
            break;
        }
        start_at += count;
    }

    if !issues.is_empty() {
        return issues;
    }

    let jql = format!("\"Epic Link\" = {epic_key}");
    let mut start_at = 0usize;
    loop {
        let query = [
            ("jql", jql.clone()),
            ("startAt", start_at.to_string()),
            ("maxResults", PAGE_SIZE.to_string()),
            ("fields", fields.join(",")),
        ];
        let page: IssuePage = match client
            .get_json("rest/api/2/search", &query)
            .await
            .and_then(|raw| Ok(serde_json::from_value(raw)?))
        {
            Ok(page) => page,
            Err(e) => {
                warn!("Fallback epic search failed for {epic_key}: {e}");
                break;
            }
        };

        let count = page.issues.len();
        issues.extend(page.issues);
        if count < PAGE_SIZE {
            break;
        }
        start_at += count;
    }

    issues
}

/// Per-issue field lookups memoized for the duration of one report run.
///
/// Failed fetches are cached as empty field sets so a flaky issue is
/// asked about once, not once per table.
#[derive(Debug, Default)]
pub struct IssueFieldCache {
    entries: HashMap<String, IssueFields>,
}

impl IssueFieldCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetches one issue's fields through the run cache. Degrades to empty
/// fields on failure.
pub async fn fetch_issue_fields(
    client: &JiraClient,
    cache: &mut IssueFieldCache,
    key: &str,
    fields: &[String],
) -> IssueFields {
    if let Some(cached) = cache.entries.get(key) {
        debug!("Field cache hit for {key}");
        return cached.clone();
    }

    let fetched = fetch_issue_fields_uncached(client, key, fields).await;
    cache.entries.insert(key.to_string(), fetched.clone());
    fetched
}

async fn fetch_issue_fields_uncached(
    client: &JiraClient,
    key: &str,
    fields: &[String],
) -> IssueFields {
    let query = [("fields", fields.join(","))];
    match client
        .get_json(&format!("rest/api/2/issue/{key}"), &query)
        .await
        .and_then(|raw| Ok(serde_json::from_value::<IssueDetail>(raw)?))
    {
        Ok(detail) => detail.fields,
        Err(e) => {
            warn!("Per-issue fetch failed for {key}: {e}");
            IssueFields::default()
        }
    }
}
