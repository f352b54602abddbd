//! Servicebook models: services, operations managers and attendance.

use clubhouse_core::attendance::{AttendanceState, StateCounts};
use clubhouse_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `services` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Service {
    pub id: DbId,
    #[serde(rename = "start")]
    pub start_at: Timestamp,
    #[serde(rename = "end")]
    pub end_at: Timestamp,
    pub place: String,
    pub topic: String,
    pub description: Option<String>,
    pub events: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Service with managers and attendance summary.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceResponse {
    #[serde(flatten)]
    pub service: Service,
    pub operations_managers: Vec<DbId>,
    pub summary: StateCounts,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateService {
    #[serde(rename = "start")]
    pub start_at: Timestamp,
    #[serde(rename = "end")]
    pub end_at: Timestamp,
    #[serde(default)]
    pub place: String,
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    pub description: Option<String>,
    pub events: Option<String>,
    #[serde(default)]
    pub operations_managers: Vec<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateService {
    #[serde(rename = "start")]
    pub start_at: Option<Timestamp>,
    #[serde(rename = "end")]
    pub end_at: Option<Timestamp>,
    pub place: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub topic: Option<String>,
    pub description: Option<String>,
    pub events: Option<String>,
    /// Replaces the managers when present.
    pub operations_managers: Option<Vec<DbId>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceListParams {
    pub from: Option<Date>,
    pub to: Option<Date>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// A row from the `attendances` table joined with member and service data.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attendance {
    pub id: DbId,
    pub service_id: DbId,
    pub service_start: Timestamp,
    pub service_topic: String,
    pub member_id: DbId,
    pub member_name: String,
    pub state: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One entry of an attendance list submission.
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceEntry {
    pub member_id: DbId,
    pub state: AttendanceState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAttendanceRequest {
    pub entries: Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAttendance {
    pub state: AttendanceState,
}

/// `(key, state, count)` aggregate row.
#[derive(Debug, Clone, FromRow)]
pub struct StateCountRow {
    pub key: DbId,
    pub state: String,
    pub count: i64,
}

/// A member's count for one state, used by the top lists.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberStateCount {
    pub member_id: DbId,
    pub member_name: String,
    pub count: i64,
}

/// A/E/F counts of one service; zero for services without attendance.
#[derive(Debug, Clone, FromRow)]
pub struct ServiceAttendanceCounts {
    pub service_id: DbId,
    pub start_at: Timestamp,
    pub present: i64,
    pub excused: i64,
    pub missing: i64,
}

impl ServiceAttendanceCounts {
    pub fn counts(&self) -> StateCounts {
        StateCounts {
            present: self.present,
            excused: self.excused,
            missing: self.missing,
        }
    }
}

/// Default start/end for a new service on a given day.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDefaults {
    pub start: Timestamp,
    pub end: Timestamp,
}
