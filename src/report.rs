use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct SprintReport {
    pub board: String,
    pub sprint: SprintSummary,
    pub generated_at: DateTime<Utc>,
    pub schedule: SprintSchedule,
    pub metrics: ReconciledMetrics,
    pub velocity_history: Vec<VelocityEntry>,
    pub burndown: BurndownSeries,
    pub cycle_time: CycleBreakdown,
    pub top_completed: Vec<EffortRow>,
    pub tech_debt_completed: Vec<EffortRow>,
    pub carry_over: Vec<EffortRow>,
    pub missing_epic: Vec<AuditRow>,
    pub missing_effort: Vec<AuditRow>,
    pub action_items: ActionItems,
    pub team: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintSummary {
    pub id: u64,
    pub name: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintSchedule {
    pub planned_start: Option<DateTime<FixedOffset>>,
    pub planned_end: Option<DateTime<FixedOffset>>,
    pub actual_start: Option<DateTime<FixedOffset>>,
    pub actual_end: Option<DateTime<FixedOffset>>,
    pub planned_working_days: u32,
    pub actual_working_days: u32,
}

/// Committed/completed effort with scope bookkeeping for one sprint.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReconciledMetrics {
    pub committed: f64,
    pub completed: f64,
    pub scope_change_count: usize,
    pub carry_over_count: usize,
}

impl ReconciledMetrics {
    pub fn completion_percentage(&self) -> f64 {
        if self.committed > 0.0 {
            (self.completed / self.committed) * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityEntry {
    pub sprint_id: u64,
    pub name: String,
    pub committed: f64,
    pub completed: f64,
    pub is_current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BurndownSeries {
    pub dates: Vec<NaiveDate>,
    pub ideal: Vec<f64>,
    pub remaining: Vec<f64>,
}

/// A daily series over a contiguous, ascending date axis.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DaySeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

/// Cycle time sub-phases in hours per day, all sharing one date axis.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CycleBreakdown {
    pub coding: DaySeries,
    pub pickup: DaySeries,
    pub review: DaySeries,
    pub cycle: DaySeries,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffortRow {
    pub key: String,
    pub summary: String,
    pub effort: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRow {
    pub key: String,
    pub summary: String,
    pub assignee: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeingRecord {
    pub key: String,
    pub summary: String,
    pub assignee: String,
    pub status: String,
    pub age_working_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneActionItem {
    pub key: String,
    pub summary: String,
    pub assignee: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActionItems {
    pub open: Vec<AgeingRecord>,
    pub done: Vec<DoneActionItem>,
}
