//! Query parameter types shared by several handler modules.

use serde::Deserialize;

/// `?active_only=` on catalog listings; defaults to everything.
#[derive(Debug, Default, Deserialize)]
pub struct ActiveOnlyParams {
    #[serde(default)]
    pub active_only: bool,
}

/// `?search=` on simple listings.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub search: Option<String>,
}
