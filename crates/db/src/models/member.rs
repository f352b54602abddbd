//! Member, parent, status/group lookup and member event models.

use clubhouse_core::members::{age_on, full_name, whatsapp_number};
use clubhouse_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// A row from the `member_statuses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberStatus {
    pub id: DbId,
    pub name: String,
    pub color: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMemberStatus {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Hex color; defaults to `#FF0000`.
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMemberStatus {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub color: Option<String>,
}

/// A row from the `member_groups` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberGroup {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Create / rename payload for name-only lookup tables.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NamePayload {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

/// A row from the `event_types` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventType {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

/// A row from the `members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Member {
    pub id: DbId,
    pub name: String,
    pub lastname: String,
    pub birthday: Option<Date>,
    pub email: Option<String>,
    pub street: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub notes: Option<String>,
    pub joined: Option<Date>,
    pub identity_card_number: Option<String>,
    pub can_swim: bool,
    pub group_id: Option<DbId>,
    pub status_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Member with derived fields for API output.
#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    #[serde(flatten)]
    pub member: Member,
    pub full_name: String,
    pub age: i32,
}

impl MemberResponse {
    pub fn new(member: Member, today: Date) -> Self {
        Self {
            full_name: full_name(&member.name, &member.lastname),
            age: age_on(member.birthday, today),
            member,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateMember {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub lastname: String,
    pub birthday: Option<Date>,
    #[validate(email)]
    pub email: Option<String>,
    pub street: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub notes: Option<String>,
    pub joined: Option<Date>,
    pub identity_card_number: Option<String>,
    #[serde(default)]
    pub can_swim: bool,
    pub group_id: Option<DbId>,
    pub status_id: Option<DbId>,
    pub user_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMember {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub lastname: Option<String>,
    pub birthday: Option<Date>,
    #[validate(email)]
    pub email: Option<String>,
    pub street: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub notes: Option<String>,
    pub joined: Option<Date>,
    pub identity_card_number: Option<String>,
    pub can_swim: Option<bool>,
    pub group_id: Option<DbId>,
    pub status_id: Option<DbId>,
    pub user_id: Option<DbId>,
}

/// Query parameters for `GET /members`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberListParams {
    pub status_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub can_swim: Option<bool>,
    /// Case-insensitive match on name, lastname, email or identity card number.
    pub search: Option<String>,
    /// One of `name`, `lastname`, `birthday`, `joined`, optionally prefixed
    /// with `-` for descending order.
    pub ordering: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Member count per status.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StatusCount {
    pub status_id: Option<DbId>,
    pub name: Option<String>,
    pub color: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberStatistics {
    pub total: i64,
    pub by_status: Vec<StatusCount>,
}

// ---------------------------------------------------------------------------
// Parents
// ---------------------------------------------------------------------------

/// A row from the `parents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Parent {
    pub id: DbId,
    pub name: String,
    pub lastname: String,
    pub email: Option<String>,
    pub email2: Option<String>,
    pub street: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Parent with derived fields and linked children.
#[derive(Debug, Clone, Serialize)]
pub struct ParentResponse {
    #[serde(flatten)]
    pub parent: Parent,
    pub full_name: String,
    pub whatsapp_number: Option<String>,
    pub children: Vec<DbId>,
}

impl ParentResponse {
    pub fn new(parent: Parent, children: Vec<DbId>) -> Self {
        Self {
            full_name: full_name(&parent.name, &parent.lastname),
            whatsapp_number: whatsapp_number(parent.mobile.as_deref()),
            children,
            parent,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateParent {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub lastname: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(email)]
    pub email2: Option<String>,
    pub street: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub children: Vec<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateParent {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub lastname: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(email)]
    pub email2: Option<String>,
    pub street: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub notes: Option<String>,
    /// Replaces the linked children when present.
    pub children: Option<Vec<DbId>>,
}

// ---------------------------------------------------------------------------
// Member events
// ---------------------------------------------------------------------------

/// A row from the `member_events` table joined with its type name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemberEvent {
    pub id: DbId,
    pub member_id: DbId,
    pub event_type_id: DbId,
    pub event_type_name: String,
    pub date: Date,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemberEvent {
    pub event_type_id: DbId,
    pub date: Date,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateMemberEvent {
    pub event_type_id: Option<DbId>,
    pub date: Option<Date>,
    pub notes: Option<String>,
}
