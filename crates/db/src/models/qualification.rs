//! Qualification, special task and their type models.

use clubhouse_core::qualifications::{
    expiry_status, task_duration_days, task_is_active, ExpiryStatus,
    DEFAULT_EXPIRY_WARNING_DAYS,
};
use clubhouse_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Qualification types
// ---------------------------------------------------------------------------

/// A row from the `qualification_types` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QualificationType {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub expires: bool,
    /// Validity in months; set exactly when `expires`.
    pub validity_period: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQualificationType {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub expires: bool,
    pub validity_period: Option<i32>,
}

/// Full replacement of the mutable fields; `expires` and
/// `validity_period` are validated together.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateQualificationType {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub expires: Option<bool>,
    pub validity_period: Option<i32>,
}

// ---------------------------------------------------------------------------
// Qualifications
// ---------------------------------------------------------------------------

/// A row from the `qualifications` table joined with type and holder names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Qualification {
    pub id: DbId,
    pub qualification_type_id: DbId,
    pub type_name: String,
    pub user_id: Option<DbId>,
    pub member_id: Option<DbId>,
    pub person_name: String,
    pub date_acquired: Date,
    pub date_expires: Option<Date>,
    pub issued_by: Option<String>,
    pub note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Qualification with its expiry classification.
#[derive(Debug, Clone, Serialize)]
pub struct QualificationResponse {
    #[serde(flatten)]
    pub qualification: Qualification,
    pub is_expired: bool,
    pub expires_soon: bool,
    pub expiry_status: ExpiryStatus,
}

impl QualificationResponse {
    pub fn new(qualification: Qualification, today: Date) -> Self {
        let status = expiry_status(
            qualification.date_expires,
            today,
            DEFAULT_EXPIRY_WARNING_DAYS,
        );
        Self {
            is_expired: status == ExpiryStatus::Expired,
            expires_soon: status == ExpiryStatus::ExpiresSoon,
            expiry_status: status,
            qualification,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateQualification {
    pub qualification_type_id: DbId,
    pub user_id: Option<DbId>,
    pub member_id: Option<DbId>,
    pub date_acquired: Date,
    /// Derived from the type's validity period when omitted.
    pub date_expires: Option<Date>,
    pub issued_by: Option<String>,
    pub note: Option<String>,
}

/// Resolved insert payload after person and expiry validation.
#[derive(Debug, Clone)]
pub struct NewQualification {
    pub qualification_type_id: DbId,
    pub user_id: Option<DbId>,
    pub member_id: Option<DbId>,
    pub date_acquired: Date,
    pub date_expires: Option<Date>,
    pub issued_by: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQualification {
    pub date_acquired: Option<Date>,
    pub date_expires: Option<Date>,
    pub issued_by: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualificationListParams {
    /// `active`, `expired` or `expiring`.
    pub status: Option<String>,
    pub qualification_type_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub member_id: Option<DbId>,
    /// Matches the holder's name.
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Special tasks
// ---------------------------------------------------------------------------

/// A row from the `special_task_types` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SpecialTaskType {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSpecialTaskType {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSpecialTaskType {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A row from the `special_tasks` table joined with type and holder names.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SpecialTask {
    pub id: DbId,
    pub task_type_id: DbId,
    pub task_name: String,
    pub user_id: Option<DbId>,
    pub member_id: Option<DbId>,
    pub person_name: String,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpecialTaskResponse {
    #[serde(flatten)]
    pub task: SpecialTask,
    pub is_active: bool,
    pub duration_days: i64,
}

impl SpecialTaskResponse {
    pub fn new(task: SpecialTask, today: Date) -> Self {
        Self {
            is_active: task_is_active(task.end_date, today),
            duration_days: task_duration_days(task.start_date, task.end_date, today),
            task,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSpecialTask {
    pub task_type_id: DbId,
    pub user_id: Option<DbId>,
    pub member_id: Option<DbId>,
    pub start_date: Date,
    pub end_date: Option<Date>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSpecialTask {
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpecialTaskListParams {
    /// `active` or `completed`.
    pub status: Option<String>,
    pub task_type_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub member_id: Option<DbId>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct QualificationCounts {
    pub total_qualifications: i64,
    pub expired_qualifications: i64,
    pub expiring_qualifications: i64,
    pub active_tasks: i64,
    pub completed_tasks: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualificationDashboard {
    #[serde(flatten)]
    pub counts: QualificationCounts,
    pub recent_qualifications: Vec<QualificationResponse>,
    pub expiring_soon: Vec<QualificationResponse>,
    pub current_tasks: Vec<SpecialTaskResponse>,
}
