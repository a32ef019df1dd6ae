// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A reporting staff member. `et_id` is the external identifier printed on
/// badges and used as the unique key; team leaders get read access to the
/// aggregated dashboard.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Engineer {
    pub id: i64,
    pub et_id: String,
    pub name: String,
    pub is_team_leader: bool,
}

/// Category of a maintenance report.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TaskCategory {
    Preventive,
    Routine,
    Maintenance,
}

/// One maintenance report, owned by a single engineer with optional
/// contributing team members.
///
/// `submitted_at` is server-assigned at creation and never changes.
/// `team_members` holds the resolved display names of the associated
/// engineers; it lives in a join table, so it is skipped by `FromRow` and
/// filled in by the query layer.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct TaskRecord {
    pub id: i64,
    pub engineer_id: i64,
    pub report_date: NaiveDate,
    pub shift: String,
    pub reporter: String,
    pub location: String,
    pub equipment_type: String,
    pub category: TaskCategory,
    pub description: String,
    pub cause_of_problem: String,
    pub corrective_measure: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub time_taken: Option<String>,
    pub status: String,
    pub remark: String,
    pub submitted_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub team_members: Vec<String>,
}

/// Structure used to receive task submission data from the API.
///
/// Note the absence of an engineer field: the owning engineer is always
/// injected server-side from the authenticated caller, never read from the
/// request body. `team_members` carries ET ids, in association order.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateTaskPayload {
    pub report_date: Option<NaiveDate>,
    #[serde(default)]
    pub shift: String,
    #[serde(default)]
    pub reporter: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub equipment_type: String,
    pub category: TaskCategory,
    pub description: String,
    #[serde(default)]
    pub cause_of_problem: String,
    #[serde(default)]
    pub corrective_measure: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub time_taken: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub team_members: Vec<String>,
}

/// Structure used to provision an engineer account.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateEngineerPayload {
    pub et_id: String,
    pub name: String,
    #[serde(default)]
    pub is_team_leader: bool,
}

/// Rejects a submission whose end time precedes its start time. Missing
/// times are fine; the check only applies when both are present.
pub fn validate_timing(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), DomainError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(DomainError::EndBeforeStart);
        }
    }
    Ok(())
}

/// Renders an elapsed duration as `HH:MM:SS`. Hours are not wrapped at 24,
/// so a two-day outage formats as `48:00:00`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.num_seconds().max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Fills in the elapsed duration at save time.
///
/// A non-blank explicit value always wins. Otherwise, when both times are
/// present and `end >= start`, the stored value is exactly `end - start`
/// formatted by [`format_elapsed`].
pub fn derive_time_taken(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    explicit: Option<String>,
) -> Option<String> {
    if let Some(explicit) = explicit.filter(|t| !t.trim().is_empty()) {
        return Some(explicit);
    }
    match (start, end) {
        (Some(start), Some(end)) if end >= start => Some(format_elapsed(end - start)),
        _ => None,
    }
}

/// Resolves the reporter field at save time.
///
/// A blank reporter, or one that exactly equals the owning engineer's name,
/// becomes the comma-joined list of the primary engineer followed by the
/// team members in association order. Any other text is kept as entered.
pub fn expand_reporter(reporter: &str, engineer_name: &str, team_members: &[String]) -> String {
    let reporter = reporter.trim();
    if !reporter.is_empty() && reporter != engineer_name {
        return reporter.to_string();
    }
    let mut names = Vec::with_capacity(team_members.len() + 1);
    names.push(engineer_name.to_string());
    names.extend(team_members.iter().cloned());
    names.join(", ")
}
