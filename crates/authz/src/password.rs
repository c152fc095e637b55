//! Argon2 password hashing in PHC string format.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::AuthError;

/// Hash `plaintext` with a fresh random salt.
pub fn hash(plaintext: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check `plaintext` against a stored PHC hash. Malformed hashes never verify.
pub fn verify(plaintext: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        tracing::warn!(target: "vidly-authz", "stored password hash is malformed");
        return false;
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let stored = hash("password1").unwrap();
        assert!(stored.starts_with("$argon2"));
        assert!(verify("password1", &stored));
        assert!(!verify("passwordx", &stored));
    }

    #[test]
    fn same_password_hashes_differently() {
        assert_ne!(hash("password1").unwrap(), hash("password1").unwrap());
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify("password1", "password1"));
    }
}
