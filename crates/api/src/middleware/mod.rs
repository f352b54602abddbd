//! Request extractors and middleware.
//!
//! - [`auth::AuthUser`] -- the caller identified by a Bearer access token.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role (superuser).
//! - [`permissions::Principal`] -- the caller with their loaded permission set.
//! - [`setup::setup_gate`] -- answers 503 until the first superuser exists.

pub mod auth;
pub mod permissions;
pub mod rbac;
pub mod setup;
