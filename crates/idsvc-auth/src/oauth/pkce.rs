//! PKCE (Proof Key for Code Exchange)
//!
//! Implements RFC 7636 with the S256 method only; `plain` is rejected.
//!
//! # Example
//!
//! ```
//! use idsvc_auth::oauth::pkce::{PkceChallenge, PkceVerifier};
//!
//! let verifier = PkceVerifier::generate();
//! let challenge = PkceChallenge::from_verifier(&verifier);
//!
//! let stored = PkceChallenge::new(challenge.as_str()).unwrap();
//! assert!(stored.verify(&verifier).is_ok());
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};

use crate::oauth::errors::ProtocolError;

/// Length of a base64url encoded SHA-256 digest.
pub const CHALLENGE_LENGTH: usize = 43;

/// Shortest and longest permitted `code_verifier`.
const VERIFIER_LENGTH: std::ops::RangeInclusive<usize> = 43..=128;

/// Why a challenge or verifier was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PkceError {
    #[error("code_verifier must be 43 to 128 characters long, got {0}")]
    VerifierLength(usize),

    #[error("code_verifier may only contain unreserved URI characters")]
    VerifierCharacters,

    /// The challenge is not a base64url SHA-256 digest.
    #[error("code_challenge is not a base64url SHA-256 digest")]
    ChallengeFormat,

    #[error("code_challenge_method '{0}' is not supported")]
    UnsupportedMethod(String),

    #[error("code_verifier does not match the code_challenge")]
    Mismatch,
}

impl PkceError {
    /// Maps the error to its catalog entry.
    #[must_use]
    pub fn to_protocol_error(&self) -> ProtocolError {
        match self {
            Self::ChallengeFormat => ProtocolError::invalid_code_challenge_length(),
            Self::UnsupportedMethod(method) => ProtocolError::invalid_code_challenge_method(method),
            Self::VerifierLength(_) | Self::VerifierCharacters | Self::Mismatch => {
                ProtocolError::invalid_code_verifier()
            }
        }
    }
}

impl From<PkceError> for ProtocolError {
    fn from(error: PkceError) -> Self {
        error.to_protocol_error()
    }
}

/// Transformation applied to the verifier. Only `S256` is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PkceChallengeMethod {
    #[default]
    S256,
}

impl PkceChallengeMethod {
    /// Parses a `code_challenge_method` value.
    ///
    /// # Errors
    ///
    /// Returns [`PkceError::UnsupportedMethod`] for anything but `S256`, `plain` included.
    pub fn parse(method: &str) -> Result<Self, PkceError> {
        if method == Self::S256.as_str() {
            Ok(Self::S256)
        } else {
            Err(PkceError::UnsupportedMethod(method.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        "S256"
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `code_verifier`: 43 to 128 characters of `[A-Za-z0-9-._~]`.
#[derive(Debug, Clone)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Validates a verifier sent by a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the length or the alphabet is wrong.
    pub fn new(verifier: impl Into<String>) -> Result<Self, PkceError> {
        let verifier = verifier.into();
        if !VERIFIER_LENGTH.contains(&verifier.len()) {
            return Err(PkceError::VerifierLength(verifier.len()));
        }

        let unreserved = |c: char| c.is_ascii_alphanumeric() || "-._~".contains(c);
        if !verifier.chars().all(unreserved) {
            return Err(PkceError::VerifierCharacters);
        }

        Ok(Self(verifier))
    }

    /// 32 random bytes, base64url encoded.
    #[must_use]
    pub fn generate() -> Self {
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A `code_challenge`: `BASE64URL(SHA256(ASCII(code_verifier)))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// Derives the S256 challenge of a verifier.
    #[must_use]
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        Self(URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_str())))
    }

    /// Validates a challenge sent by a client.
    ///
    /// # Errors
    ///
    /// Returns [`PkceError::ChallengeFormat`] unless the value is 43 base64url
    /// characters.
    pub fn new(challenge: impl Into<String>) -> Result<Self, PkceError> {
        let challenge = challenge.into();
        if challenge.len() != CHALLENGE_LENGTH || URL_SAFE_NO_PAD.decode(&challenge).is_err() {
            return Err(PkceError::ChallengeFormat);
        }
        Ok(Self(challenge))
    }

    /// # Errors
    ///
    /// Returns [`PkceError::Mismatch`] if `verifier` does not hash to this challenge.
    pub fn verify(&self, verifier: &PkceVerifier) -> Result<(), PkceError> {
        (Self::from_verifier(verifier) == *self)
            .then_some(())
            .ok_or(PkceError::Mismatch)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Checks a raw verifier against the challenge recorded on a code.
///
/// # Errors
///
/// Returns the catalog error for a malformed or mismatching verifier.
pub fn verify_code_verifier(
    challenge: &str,
    method: Option<&str>,
    verifier: &str,
) -> Result<(), ProtocolError> {
    if let Some(method) = method {
        PkceChallengeMethod::parse(method)?;
    }
    PkceChallenge::new(challenge)?.verify(&PkceVerifier::new(verifier)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636, Appendix B
    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_rfc_vector() {
        let verifier = PkceVerifier::new(RFC_VERIFIER).unwrap();
        assert_eq!(PkceChallenge::from_verifier(&verifier).as_str(), RFC_CHALLENGE);
        assert!(verify_code_verifier(RFC_CHALLENGE, Some("S256"), RFC_VERIFIER).is_ok());
    }

    #[test]
    fn test_generated_verifier_round_trip() {
        let verifier = PkceVerifier::generate();
        assert_eq!(verifier.as_str().len(), 43);
        let challenge = PkceChallenge::from_verifier(&verifier);
        assert!(challenge.verify(&verifier).is_ok());
    }

    #[test]
    fn test_verifier_length() {
        assert!(matches!(
            PkceVerifier::new("a".repeat(42)),
            Err(PkceError::VerifierLength(42))
        ));
        assert!(PkceVerifier::new("a".repeat(43)).is_ok());
        assert!(PkceVerifier::new("a".repeat(128)).is_ok());
        assert!(PkceVerifier::new("a".repeat(129)).is_err());
    }

    #[test]
    fn test_verifier_characters() {
        let invalid = format!("{}+", "a".repeat(43));
        assert!(matches!(
            PkceVerifier::new(invalid),
            Err(PkceError::VerifierCharacters)
        ));
    }

    #[test]
    fn test_plain_rejected() {
        assert_eq!(
            PkceChallengeMethod::parse("plain").unwrap_err(),
            PkceError::UnsupportedMethod("plain".to_string())
        );
    }

    #[test]
    fn test_challenge_length() {
        assert!(PkceChallenge::new("short").is_err());
        assert!(PkceChallenge::new(RFC_CHALLENGE).is_ok());
    }

    #[test]
    fn test_mismatch_maps_to_catalog() {
        let other = PkceVerifier::generate();
        let error = verify_code_verifier(RFC_CHALLENGE, None, other.as_str()).unwrap_err();
        assert_eq!(error, ProtocolError::invalid_code_verifier());
    }
}
