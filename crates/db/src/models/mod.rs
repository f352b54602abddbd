//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod inventory;
pub mod member;
pub mod notification;
pub mod order;
pub mod qualification;
pub mod service;
pub mod session;
pub mod settings;
pub mod user;
