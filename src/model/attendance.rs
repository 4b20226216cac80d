use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// The only status this service writes; absence is represented by the record
/// not existing at all.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
}

/// One user's attendance for one business day. Unique per (user_id, date).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: u64,
    pub user_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    /// Minutes; recomputed whenever a break closes.
    pub total_break_time: Option<i64>,
    /// Minutes; written at check-out only and unset until then.
    pub total_work_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct BreakRecord {
    pub id: u64,
    pub attendance_id: u64,
    #[schema(format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub end_time: Option<DateTime<Utc>>,
    /// Minutes; set when the break closes.
    pub duration: Option<i64>,
}

impl BreakRecord {
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}

/// An attendance record together with its breaks, ordered by creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceDay {
    pub record: AttendanceRecord,
    pub breaks: Vec<BreakRecord>,
}

impl AttendanceDay {
    /// The break currently in progress, if any.
    ///
    /// At most one break per day may have `end_time` unset; every caller that
    /// needs the open break goes through this accessor.
    pub fn active_break(&self) -> Option<&BreakRecord> {
        self.breaks.iter().find(|b| b.is_active())
    }

    pub fn is_checked_in(&self) -> bool {
        self.record.check_in.is_some()
    }

    pub fn is_checked_out(&self) -> bool {
        self.record.check_out.is_some()
    }
}

/// Who an attendance row belongs to, for the management views.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct UserSummary {
    pub id: u64,
    #[schema(example = "Michael Chen")]
    pub name: String,
    #[schema(example = "Software Engineer")]
    pub position: Option<String>,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
}
