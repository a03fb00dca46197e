//! Password hashing and verification using argon2id.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Rejection message for weak passwords (shown to the user verbatim).
pub const WEAK_PASSWORD_MESSAGE: &str =
    "Please enter a strong password with a mix of numbers, uppercase and lowercase letters, \
     and special characters";

/// Hash a password using argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Password policy: at least 8 characters, one uppercase, one lowercase,
/// and one digit or special character.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit() || !c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("mysecret").unwrap();
        assert!(verify_password("mysecret", &hash).unwrap());
        assert!(!verify_password("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn salts_are_random() {
        let h1 = hash_password("S3cret!!").unwrap();
        let h2 = hash_password("S3cret!!").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("whatever", "not-a-phc-string").is_err());
    }

    #[test]
    fn strength_policy() {
        assert!(is_strong_password("S3cret!!"));
        assert!(is_strong_password("Abcdefg1"));
        assert!(is_strong_password("Abcdefg!"));

        assert!(!is_strong_password("short1A"));      // too short
        assert!(!is_strong_password("alllowercase1")); // no uppercase
        assert!(!is_strong_password("ALLUPPERCASE1")); // no lowercase
        assert!(!is_strong_password("NoDigitsHere"));  // no digit or special
    }
}
