// Password hashing and verification

use crate::auth::error::AuthError;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Password service for hashing and verification
///
/// Argon2id with default parameters and a fresh random salt per hash.
/// Verification compares digests in constant time.
pub struct PasswordService;

impl PasswordService {
    /// Hash a password using Argon2id
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!("Password hashing failed: {}", e);
                AuthError::internal("error hashing password")
            })
    }

    /// Verify a password against a stored hash
    ///
    /// Returns `Ok(false)` on mismatch; an unparseable stored hash is an
    /// internal error, not a caller error.
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!("Stored password hash is unreadable: {}", e);
            AuthError::internal("error reading password hash")
        })?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => {
                error!("Password verification failed: {}", e);
                Err(AuthError::internal("error verifying password"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = PasswordService::hash_password("correct horse").unwrap();
        assert!(PasswordService::verify_password("correct horse", &hash).unwrap());
        assert!(!PasswordService::verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_hash_never_contains_password() {
        let hash = PasswordService::hash_password("pw-plaintext").unwrap();
        assert!(!hash.contains("pw-plaintext"));
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_same_password_hashes_differ() {
        let first = PasswordService::hash_password("pw").unwrap();
        let second = PasswordService::hash_password("pw").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_garbage_hash_is_internal_error() {
        let result = PasswordService::verify_password("pw", "not-a-phc-string");
        assert!(matches!(result, Err(AuthError::Internal(_))));
    }
}
