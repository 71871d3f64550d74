//! Token binding hashes.
//!
//! ID tokens bind the authorization code and access token issued alongside
//! them through `c_hash` and `at_hash` (OpenID Connect Core 3.1.3.6 and
//! 3.3.2.11): hash the ASCII token with the digest of the ID token's signing
//! algorithm, keep the left half and base64url-encode it without padding.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::token::jwt::SigningAlgorithm;

/// Computes the `c_hash`/`at_hash` value of `token` for `algorithm`.
#[must_use]
pub fn token_hash(token: &str, algorithm: SigningAlgorithm) -> String {
    let digest = match algorithm.hash_bits() {
        256 => Sha256::digest(token.as_bytes()).to_vec(),
        384 => Sha384::digest(token.as_bytes()).to_vec(),
        _ => Sha512::digest(token.as_bytes()).to_vec(),
    };
    URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}
