//! Token model, serialization and hashing.
//!
//! - [`model`] - Token kinds, claim rules and the validated [`Token`] value
//! - [`jwt`] - Key pairs, JWKS export and JWS signing/verification
//! - [`hash`] - `c_hash`/`at_hash` computation

pub mod hash;
pub mod jwt;
pub mod model;

pub use hash::token_hash;
pub use jwt::{
    Jwk, JwkParams, Jwks, JwtError, JwtPayload, JwtSigner, PemKeyPair, SigningAlgorithm,
    SigningKeyPair,
};
pub use model::{ClaimRules, Token, TokenError, TokenKind};
