use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CODING_METRIC: &str = "branch.time_to_pr";
pub const PICKUP_METRIC: &str = "branch.time_to_review";
pub const REVIEW_METRIC: &str = "branch.review_time";
pub const METRIC_AGG: &str = "p50";

/// Body of the batched measurements query.
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementRequest {
    pub group_by: String,
    pub team_ids: Vec<u64>,
    pub roll_up: String,
    pub requested_metrics: Vec<RequestedMetric>,
    pub time_ranges: Vec<TimeRange>,
    pub return_no_data: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestedMetric {
    pub name: String,
    pub agg: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimeRange {
    pub after: NaiveDate,
    pub before: NaiveDate,
}

impl MeasurementRequest {
    /// The daily cycle-time sub-phase query: one p50 per sub-phase per
    /// day over the inclusive range.
    pub fn daily_cycle_phases(team_id: u64, after: NaiveDate, before: NaiveDate) -> Self {
        let requested_metrics = [CODING_METRIC, PICKUP_METRIC, REVIEW_METRIC]
            .iter()
            .map(|name| RequestedMetric {
                name: (*name).to_string(),
                agg: METRIC_AGG.to_string(),
            })
            .collect();

        Self {
            group_by: "team".to_string(),
            team_ids: vec![team_id],
            roll_up: "1d".to_string(),
            requested_metrics,
            time_ranges: vec![TimeRange { after, before }],
            return_no_data: true,
            limit: 1000,
        }
    }
}

/// One per-day slice of the measurements response. Metric maps are keyed
/// `<name>:<agg>`; a day the service has no data for carries nulls.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementSlice {
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub metrics: Vec<HashMap<String, Option<f64>>>,
}

/// Minutes per cycle-time sub-phase for one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyCycleRow {
    pub date: NaiveDate,
    pub coding_min: Option<f64>,
    pub pickup_min: Option<f64>,
    pub review_min: Option<f64>,
}

impl MeasurementSlice {
    /// Flattens the slice into a typed row; `None` when the slice has no
    /// parseable date.
    pub fn into_row(self) -> Option<DailyCycleRow> {
        let raw_date = self.after?;
        let date: NaiveDate = raw_date.split('T').next()?.parse().ok()?;

        let coding_key = format!("{CODING_METRIC}:{METRIC_AGG}");
        let pickup_key = format!("{PICKUP_METRIC}:{METRIC_AGG}");
        let review_key = format!("{REVIEW_METRIC}:{METRIC_AGG}");

        let mut row = DailyCycleRow {
            date,
            coding_min: None,
            pickup_min: None,
            review_min: None,
        };
        for metrics in &self.metrics {
            for (key, value) in metrics {
                if *key == coding_key {
                    row.coding_min = *value;
                } else if *key == pickup_key {
                    row.pickup_min = *value;
                } else if *key == review_key {
                    row.review_min = *value;
                }
            }
        }
        Some(row)
    }
}
