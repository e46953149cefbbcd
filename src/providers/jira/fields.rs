use log::info;

use crate::error::{Result, SprintLensError};

use super::client::JiraClient;
use super::types::{FieldDef, IssueFields};

const EPIC_LINK_FIELD_NAME: &str = "epic link";
const EFFORT_FIELD_MARKER: &str = "story point";
const PREFERRED_EFFORT_NAMES: [&str; 2] = ["story points", "story point"];

/// Custom-field layout discovered from the tracker's field catalog.
///
/// Built once per run and handed to every component that needs to read
/// estimation or epic-link values off an issue. `effort_fields` is
/// ordered with the preferred field first; per issue, the first field
/// holding a usable value wins.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub epic_link_field: String,
    pub effort_fields: Vec<String>,
}

impl FieldSchema {
    pub fn primary_effort_field(&self) -> &str {
        &self.effort_fields[0]
    }

    /// First usable estimation value on the issue, scanning the
    /// discovered fields in order. Null and unparseable values are
    /// skipped rather than treated as zero.
    pub fn effort_of(&self, fields: &IssueFields) -> Option<f64> {
        for id in &self.effort_fields {
            let Some(value) = fields.custom.get(id) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if let Some(number) = value.as_f64() {
                return Some(number);
            }
            if let Some(parsed) = value.as_str().and_then(|s| s.trim().parse::<f64>().ok()) {
                return Some(parsed);
            }
        }
        None
    }

    /// All values present (non-null) in any discovered effort field,
    /// with unusable entries counted as zero.
    pub fn present_effort_values(&self, fields: &IssueFields) -> Vec<f64> {
        self.effort_fields
            .iter()
            .filter_map(|id| fields.custom.get(id))
            .filter(|value| !value.is_null())
            .map(|value| {
                value
                    .as_f64()
                    .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// Epic key on the issue; the tracker serializes the link either as
    /// a bare key string or as an object with a `key` member.
    pub fn epic_key_of(&self, fields: &IssueFields) -> Option<String> {
        let value = fields.custom.get(&self.epic_link_field)?;
        if let Some(key) = value.as_str() {
            return Some(key.to_string());
        }
        value
            .get("key")
            .and_then(|k| k.as_str())
            .map(str::to_string)
    }
}

/// Resolves the epic-link and estimation fields from the field catalog.
///
/// Runs once per report. The whole run is aborted if either field cannot
/// be resolved, since every downstream metric depends on them.
pub async fn discover_fields(client: &JiraClient) -> Result<FieldSchema> {
    let raw = client.get_json("rest/api/2/field", &[]).await?;
    let defs: Vec<FieldDef> = serde_json::from_value(raw)?;
    let schema = resolve_schema(&defs)?;

    info!(
        "Resolved epic link field '{}' and {} estimation field(s), primary '{}'",
        schema.epic_link_field,
        schema.effort_fields.len(),
        schema.primary_effort_field()
    );

    Ok(schema)
}

fn resolve_schema(defs: &[FieldDef]) -> Result<FieldSchema> {
    let epic_link_field = defs
        .iter()
        .find(|d| d.name.to_lowercase() == EPIC_LINK_FIELD_NAME)
        .map(|d| d.id.clone());

    let candidates: Vec<&FieldDef> = defs
        .iter()
        .filter(|d| d.name.to_lowercase().contains(EFFORT_FIELD_MARKER))
        .filter(|d| {
            d.schema
                .as_ref()
                .and_then(|s| s.field_type.as_deref())
                .map(|t| t == "number")
                .unwrap_or(false)
        })
        .filter(|d| d.id.starts_with("customfield_"))
        .collect();

    let primary = PREFERRED_EFFORT_NAMES
        .iter()
        .find_map(|preferred| {
            candidates
                .iter()
                .find(|d| d.name.to_lowercase() == *preferred)
        })
        .or_else(|| candidates.first())
        .map(|d| d.id.clone());

    match (epic_link_field, primary) {
        (Some(epic_link_field), Some(primary)) => {
            let mut effort_fields = vec![primary];
            for candidate in &candidates {
                if !effort_fields.contains(&candidate.id) {
                    effort_fields.push(candidate.id.clone());
                }
            }
            Ok(FieldSchema {
                epic_link_field,
                effort_fields,
            })
        }
        (None, _) => Err(SprintLensError::SchemaDiscovery(
            "no 'Epic Link' field in the field catalog".to_string(),
        )),
        (_, None) => Err(SprintLensError::SchemaDiscovery(
            "no numeric story-point custom field in the field catalog".to_string(),
        )),
    }
}
