//! Exclusive user-or-member references.
//!
//! Qualifications and special tasks belong to either a system user or a
//! member record, never both and never neither.

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

/// The holder of a qualification or special task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum PersonRef {
    User(DbId),
    Member(DbId),
}

impl PersonRef {
    /// Build a reference from the two nullable columns, enforcing exclusivity.
    pub fn from_ids(user_id: Option<DbId>, member_id: Option<DbId>) -> Result<Self, CoreError> {
        match (user_id, member_id) {
            (Some(user), None) => Ok(PersonRef::User(user)),
            (None, Some(member)) => Ok(PersonRef::Member(member)),
            (Some(_), Some(_)) => Err(CoreError::Validation(
                "Only one of user or member may be set".into(),
            )),
            (None, None) => Err(CoreError::Validation(
                "Either a user or a member must be set".into(),
            )),
        }
    }

    pub fn user_id(&self) -> Option<DbId> {
        match self {
            PersonRef::User(id) => Some(*id),
            PersonRef::Member(_) => None,
        }
    }

    pub fn member_id(&self) -> Option<DbId> {
        match self {
            PersonRef::Member(id) => Some(*id),
            PersonRef::User(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_only_is_accepted() {
        let person = PersonRef::from_ids(Some(4), None).unwrap();
        assert_eq!(person, PersonRef::User(4));
        assert_eq!(person.user_id(), Some(4));
        assert_eq!(person.member_id(), None);
    }

    #[test]
    fn member_only_is_accepted() {
        let person = PersonRef::from_ids(None, Some(9)).unwrap();
        assert_eq!(person.member_id(), Some(9));
    }

    #[test]
    fn both_set_is_rejected() {
        let err = PersonRef::from_ids(Some(1), Some(2)).unwrap_err();
        assert!(matches!(err, CoreError::Validation(msg) if msg.contains("Only one")));
    }

    #[test]
    fn neither_set_is_rejected() {
        let err = PersonRef::from_ids(None, None).unwrap_err();
        assert!(matches!(err, CoreError::Validation(msg) if msg.contains("Either")));
    }
}
