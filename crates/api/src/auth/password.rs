//! Argon2id password hashing.
//!
//! Hashes are stored as PHC strings so parameters and salt travel with them.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only for malformed hashes.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Length counts characters, not bytes.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {min_length} characters long"
        ));
    }
    if password.trim().is_empty() {
        return Err("Password must not be blank".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("Feuerwehr112!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Feuerwehr112!", &hash).unwrap());
        assert!(!verify_password("feuerwehr112!", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn strength_counts_characters() {
        assert!(validate_password_strength("kurz", MIN_PASSWORD_LENGTH).is_err());
        assert!(validate_password_strength("Ämterübergabe", MIN_PASSWORD_LENGTH).is_ok());
        let msg = validate_password_strength("abc", 8).unwrap_err();
        assert!(msg.contains("at least 8 characters"));
        assert!(validate_password_strength("          ", 8).is_err());
    }
}
