//! Client secret generation and verification.
//!
//! Confidential applications authenticate at the token endpoint with a
//! secret. Only its Argon2id hash is stored on the [`Application`](crate::types::Application).
//!
//! # Example
//!
//! ```
//! use idsvc_auth::client_secret::{generate_client_secret, hash_client_secret, verify_client_secret};
//!
//! let secret = generate_client_secret();
//! let hash = hash_client_secret(&secret).unwrap();
//! assert!(verify_client_secret(&secret, &hash).unwrap());
//! ```

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

/// Generate a new client secret.
///
/// 32 random bytes, hex encoded with a `cs_` prefix (67 characters).
#[must_use]
pub fn generate_client_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    format!("cs_{}", hex::encode(bytes))
}

/// Hash a client secret for storage using Argon2id.
///
/// Returns the PHC string.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails.
pub fn hash_client_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a client secret against a stored Argon2 hash.
///
/// # Errors
///
/// Returns an error only if the stored hash is malformed.
pub fn verify_client_secret(secret: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret_format() {
        let secret = generate_client_secret();
        assert!(secret.starts_with("cs_"));
        assert_eq!(secret.len(), 67);
        assert!(hex::decode(&secret[3..]).is_ok());
        assert_ne!(secret, generate_client_secret());
    }

    #[test]
    fn test_hash_and_verify() {
        let secret = generate_client_secret();
        let hash = hash_client_secret(&secret).unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_client_secret(&secret, &hash).unwrap());
        assert!(!verify_client_secret("cs_wrong", &hash).unwrap());
    }

    #[test]
    fn test_salted_hashes_differ() {
        let secret = generate_client_secret();
        let first = hash_client_secret(&secret).unwrap();
        let second = hash_client_secret(&secret).unwrap();

        assert_ne!(first, second);
        assert!(verify_client_secret(&secret, &second).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_client_secret("secret", "not-a-phc-string").is_err());
    }
}
