//! Opaque token protection.
//!
//! Authorization codes and refresh tokens never leave the engine in clear
//! form. A [`TokenProtector`] serializes the validated token and encrypts it
//! under a key bound to a *purpose* string, so a refresh token can never be
//! replayed as an authorization code and vice versa.
//!
//! [`DataProtector`] derives one AES-256-GCM key per purpose from a master key
//! with HMAC-SHA256 and authenticates the purpose as associated data. The
//! protected form is `base64url(nonce || ciphertext)`.

use std::fmt;

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use base64::{
    Engine,
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD},
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::token::Token;

/// Nonce size for AES-256-GCM (96 bits)
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits)
pub const KEY_SIZE: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// Purpose strings that bind protected tokens to their use.
pub mod purposes {
    /// Authorization codes.
    pub const AUTHORIZATION_CODE: &str = "authorization_code";
    /// Refresh tokens.
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Errors raised while protecting or unprotecting a token.
///
/// The variants are for diagnostics only; callers surface every unprotect
/// failure as an invalid token.
#[derive(Debug, thiserror::Error)]
pub enum ProtectionError {
    /// The master key is malformed.
    #[error("Invalid protection key: {0}")]
    InvalidKey(String),

    /// Encryption failed.
    #[error("Encryption failed")]
    Encryption,

    /// The protected string is not valid base64url or is too short.
    #[error("Malformed protected payload")]
    Malformed,

    /// Authentication of the ciphertext failed (wrong key, purpose or tampering).
    #[error("Decryption failed")]
    Decryption,

    /// The decrypted payload is not a valid token.
    #[error("Invalid token payload: {0}")]
    Payload(String),
}

/// Serializes and encrypts tokens for transport as opaque strings.
pub trait TokenProtector: Send + Sync {
    /// Protects a token for the given purpose.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or encryption fails.
    fn protect(&self, purpose: &str, token: &Token) -> Result<String, ProtectionError>;

    /// Reverses [`protect`](Self::protect) and re-validates the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the string was not produced by `protect` with the
    /// same key and purpose, or if the payload is not a valid token.
    fn unprotect(&self, purpose: &str, protected: &str) -> Result<Token, ProtectionError>;
}

/// AES-256-GCM token protector with per-purpose derived keys.
#[derive(Clone)]
pub struct DataProtector {
    master_key: [u8; KEY_SIZE],
}

impl fmt::Debug for DataProtector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProtector").finish_non_exhaustive()
    }
}

impl DataProtector {
    /// Creates a protector from a 256-bit master key.
    #[must_use]
    pub fn new(master_key: [u8; KEY_SIZE]) -> Self {
        Self { master_key }
    }

    /// Creates a protector with a random master key.
    ///
    /// Tokens protected by it cannot be read after the process exits.
    #[must_use]
    pub fn ephemeral() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        Self::new(key)
    }

    /// Creates a protector from a hex or base64 encoded master key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not decode to 32 bytes.
    pub fn from_encoded_key(encoded: &str) -> Result<Self, ProtectionError> {
        parse_key(encoded).map(Self::new)
    }

    fn cipher(&self, purpose: &str) -> Result<Aes256Gcm, ProtectionError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.master_key)
            .map_err(|e| ProtectionError::InvalidKey(e.to_string()))?;
        mac.update(purpose.as_bytes());
        let subkey = mac.finalize().into_bytes();

        Aes256Gcm::new_from_slice(&subkey).map_err(|e| ProtectionError::InvalidKey(e.to_string()))
    }
}

impl TokenProtector for DataProtector {
    fn protect(&self, purpose: &str, token: &Token) -> Result<String, ProtectionError> {
        let plaintext =
            serde_json::to_vec(token).map_err(|e| ProtectionError::Payload(e.to_string()))?;
        let cipher = self.cipher(purpose)?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let ciphertext = cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: &plaintext,
                    aad: purpose.as_bytes(),
                },
            )
            .map_err(|_| ProtectionError::Encryption)?;

        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(output))
    }

    fn unprotect(&self, purpose: &str, protected: &str) -> Result<Token, ProtectionError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(protected)
            .map_err(|_| ProtectionError::Malformed)?;
        if bytes.len() <= NONCE_SIZE {
            return Err(ProtectionError::Malformed);
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
        let nonce_bytes: [u8; NONCE_SIZE] = nonce_bytes
            .try_into()
            .map_err(|_| ProtectionError::Malformed)?;
        let plaintext = self
            .cipher(purpose)?
            .decrypt(
                &Nonce::from(nonce_bytes),
                Payload {
                    msg: ciphertext,
                    aad: purpose.as_bytes(),
                },
            )
            .map_err(|_| ProtectionError::Decryption)?;

        serde_json::from_slice(&plaintext).map_err(|e| ProtectionError::Payload(e.to_string()))
    }
}

/// Parses a 256-bit key from a hex or base64 string.
///
/// # Errors
///
/// Returns an error if the string decodes to anything but 32 bytes.
pub fn parse_key(key_str: &str) -> Result<[u8; KEY_SIZE], ProtectionError> {
    let key_str = key_str.trim();

    // Try hex first
    if key_str.len() == KEY_SIZE * 2 {
        if let Ok(bytes) = hex::decode(key_str) {
            let mut key = [0u8; KEY_SIZE];
            key.copy_from_slice(&bytes);
            return Ok(key);
        }
    }

    let bytes = BASE64
        .decode(key_str)
        .map_err(|e| ProtectionError::InvalidKey(format!("Invalid base64 key: {e}")))?;

    if bytes.len() != KEY_SIZE {
        return Err(ProtectionError::InvalidKey(format!(
            "Key must be {} bytes, got {}",
            KEY_SIZE,
            bytes.len()
        )));
    }

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&bytes);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenKind;
    use crate::types::claims::{Claim, claim_types};

    fn refresh_token() -> Token {
        Token::new(
            TokenKind::RefreshToken,
            vec![
                Claim::new(claim_types::TOKEN_ID, "rt-1"),
                Claim::new(claim_types::ISSUED_AT, "1700000000"),
                Claim::new(claim_types::EXPIRES, "1702592000"),
                Claim::new(claim_types::NOT_BEFORE, "1700000000"),
                Claim::new(claim_types::USER_ID, "user-1"),
                Claim::new(claim_types::CLIENT_ID, "clientB"),
                Claim::new(claim_types::SCOPE, "openid offline_access"),
                Claim::new(claim_types::GRANTED_TOKEN, "access_token"),
                Claim::new(claim_types::GRANTED_TOKEN, "refresh_token"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_protect_unprotect_round_trip() {
        let protector = DataProtector::new([7u8; KEY_SIZE]);
        let token = refresh_token();

        let protected = protector
            .protect(purposes::REFRESH_TOKEN, &token)
            .unwrap();
        assert!(!protected.contains("user-1"));

        let restored = protector
            .unprotect(purposes::REFRESH_TOKEN, &protected)
            .unwrap();
        assert_eq!(restored, token);
    }

    #[test]
    fn test_protection_is_randomized() {
        let protector = DataProtector::ephemeral();
        let token = refresh_token();
        let a = protector.protect(purposes::REFRESH_TOKEN, &token).unwrap();
        let b = protector.protect(purposes::REFRESH_TOKEN, &token).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_purpose_fails_closed() {
        let protector = DataProtector::new([7u8; KEY_SIZE]);
        let protected = protector
            .protect(purposes::REFRESH_TOKEN, &refresh_token())
            .unwrap();

        let result = protector.unprotect(purposes::AUTHORIZATION_CODE, &protected);
        assert!(matches!(result, Err(ProtectionError::Decryption)));
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let protected = DataProtector::new([7u8; KEY_SIZE])
            .protect(purposes::REFRESH_TOKEN, &refresh_token())
            .unwrap();

        let result =
            DataProtector::new([8u8; KEY_SIZE]).unprotect(purposes::REFRESH_TOKEN, &protected);
        assert!(matches!(result, Err(ProtectionError::Decryption)));
    }

    #[test]
    fn test_malformed_input_rejected() {
        let protector = DataProtector::ephemeral();
        assert!(matches!(
            protector.unprotect(purposes::REFRESH_TOKEN, "not base64!"),
            Err(ProtectionError::Malformed)
        ));
        assert!(matches!(
            protector.unprotect(purposes::REFRESH_TOKEN, "AAAA"),
            Err(ProtectionError::Malformed)
        ));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let protector = DataProtector::ephemeral();
        let protected = protector
            .protect(purposes::REFRESH_TOKEN, &refresh_token())
            .unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&protected).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert!(protector.unprotect(purposes::REFRESH_TOKEN, &tampered).is_err());
    }

    #[test]
    fn test_parse_key_hex_and_base64() {
        let hex_key = "00".repeat(KEY_SIZE);
        assert_eq!(parse_key(&hex_key).unwrap(), [0u8; KEY_SIZE]);

        let b64_key = BASE64.encode([1u8; KEY_SIZE]);
        assert_eq!(parse_key(&b64_key).unwrap(), [1u8; KEY_SIZE]);

        assert!(parse_key("too-short").is_err());
        assert!(DataProtector::from_encoded_key(&BASE64.encode([1u8; 16])).is_err());
    }
}
