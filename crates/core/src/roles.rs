//! Well-known role name constants carried in access tokens.
//!
//! Roles are derived from the `is_superuser` / `is_staff` flags on the user
//! row; fine-grained access is handled by [`crate::permissions`].

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";
pub const ROLE_USER: &str = "user";

/// Resolve the token role for a user's flags.
pub fn role_for(is_superuser: bool, is_staff: bool) -> &'static str {
    if is_superuser {
        ROLE_ADMIN
    } else if is_staff {
        ROLE_STAFF
    } else {
        ROLE_USER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superuser_wins_over_staff() {
        assert_eq!(role_for(true, true), ROLE_ADMIN);
        assert_eq!(role_for(false, true), ROLE_STAFF);
        assert_eq!(role_for(false, false), ROLE_USER);
    }
}
