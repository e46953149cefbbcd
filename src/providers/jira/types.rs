use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer};

/// Scrum board as returned by the agile board listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Board {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoardPage {
    #[serde(default)]
    pub values: Vec<Board>,
}

/// Sprint as returned by the agile API.
///
/// Date fields arrive as strings in several historical formats and are
/// parsed leniently; anything unparseable becomes `None`. Force-closed
/// sprints routinely lack `completeDate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub start_date: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub end_date: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub complete_date: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub activated_date: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SprintPage {
    #[serde(default)]
    pub values: Vec<Sprint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct IssuePage {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Issue fields: the handful the engine understands plus everything else
/// flattened into `custom`, where discovered estimation and epic-link
/// fields are looked up by id.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub issuetype: Option<IssueType>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub created: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "deserialize_opt_date")]
    pub resolutiondate: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub subtasks: Vec<SubtaskRef>,
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl IssueFields {
    pub fn summary_text(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    pub fn type_name(&self) -> Option<&str> {
        self.issuetype.as_ref().map(|t| t.name.as_str())
    }

    pub fn status_name(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.name.as_deref())
            .unwrap_or("")
    }

    pub fn status_category(&self) -> StatusCategoryKey {
        self.status
            .as_ref()
            .and_then(|s| s.status_category.as_ref())
            .and_then(|c| c.key)
            .unwrap_or(StatusCategoryKey::Unknown)
    }

    pub fn is_done(&self) -> bool {
        self.status_category() == StatusCategoryKey::Done
    }

    pub fn assignee_display(&self) -> Option<&str> {
        let assignee = self.assignee.as_ref()?;
        assignee
            .display_name
            .as_deref()
            .or(assignee.name.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueType {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "statusCategory")]
    pub status_category: Option<StatusCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusCategory {
    #[serde(default)]
    pub key: Option<StatusCategoryKey>,
}

/// Tracker status category. Every completion decision in the engine goes
/// through this, never through raw status names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategoryKey {
    New,
    Indeterminate,
    Done,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtaskRef {
    pub key: String,
}

/// One entry of the tracker-wide field catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub schema: Option<FieldSchemaInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSchemaInfo {
    #[serde(default, rename = "type")]
    pub field_type: Option<String>,
}

/// Wrapper for a single-issue fetch (`/rest/api/2/issue/{key}`).
#[derive(Debug, Clone, Deserialize)]
pub struct IssueDetail {
    #[serde(default)]
    pub fields: IssueFields,
}

/// Sprint report document from the greenhopper charts endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SprintReportDoc {
    #[serde(default)]
    pub contents: SprintReportContents,
    #[serde(default)]
    pub sprint: Option<Sprint>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SprintReportContents {
    #[serde(default)]
    pub completed_issues: Vec<ReportIssue>,
    #[serde(default)]
    pub issues_not_completed_in_current_sprint: Vec<ReportIssue>,
    /// Keys added after sprint start; the upstream serializes this as an
    /// object keyed by issue key, values carry no information.
    #[serde(default)]
    pub issue_keys_added_during_sprint: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIssue {
    pub key: String,
    #[serde(default)]
    pub estimate_statistic: Option<EstimateStatistic>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateStatistic {
    #[serde(default)]
    pub stat_field_value: Option<StatFieldValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatFieldValue {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ReportIssue {
    /// Effort recorded in the sprint report for this item, 0.0 when the
    /// estimate is absent or unparseable.
    pub fn effort(&self) -> f64 {
        let Some(stat) = self
            .estimate_statistic
            .as_ref()
            .and_then(|e| e.stat_field_value.as_ref())
        else {
            return 0.0;
        };

        if let Some(value) = stat.value {
            return value;
        }
        stat.text
            .as_deref()
            .and_then(|t| t.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }
}

/// Velocity chart document: per-sprint estimated/completed stat entries
/// keyed by sprint id rendered as a string.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VelocityChart {
    #[serde(default)]
    pub velocity_stat_entries: HashMap<String, VelocityStatEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VelocityStatEntry {
    #[serde(default)]
    pub estimated: Option<StatValue>,
    #[serde(default)]
    pub completed: Option<StatValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatValue {
    #[serde(default)]
    pub value: Option<f64>,
}

/// Parses the date formats the tracker is known to emit:
/// RFC 3339, ISO 8601 with a colon-less offset (`+0000`), with or
/// without fractional seconds, and the legacy `2024/01/15 10:30` form.
pub fn parse_tracker_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    // Legacy form carries no offset; treat it as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y/%m/%d %H:%M") {
        return Some(naive.and_utc().fixed_offset());
    }

    None
}

fn deserialize_opt_date<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_tracker_date))
}
