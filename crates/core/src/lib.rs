pub mod attendance;
pub mod error;
pub mod inventory;
pub mod members;
pub mod orders;
pub mod permissions;
pub mod person;
pub mod preferences;
pub mod qualifications;
pub mod roles;
pub mod templating;
pub mod types;
