use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Validate a `#RRGGBB` hex color string.
pub fn validate_hex_color(color: &str) -> Result<(), CoreError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid color '{color}'. Expected format #RRGGBB"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert!(validate_hex_color("#FF0000").is_ok());
        assert!(validate_hex_color("#6c757d").is_ok());
        assert!(validate_hex_color("FF0000").is_err());
        assert!(validate_hex_color("#FF00").is_err());
        assert!(validate_hex_color("#GG0000").is_err());
    }
}
