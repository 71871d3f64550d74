//! JWT signing and verification.
//!
//! Access tokens and ID tokens are serialized as compact JWS values. This
//! module owns the key material ([`SigningKeyPair`]), its JWK export and the
//! [`JwtSigner`] that turns a claim payload into a signed token and back.
//!
//! ## Supported Algorithms
//!
//! - **RS256**: RSA with SHA-256 (widely compatible)
//! - **RS384**: RSA with SHA-384
//! - **RS512**: RSA with SHA-512
//! - **ES384**: ECDSA with P-384 curve (smaller keys)
//!
//! ## Example
//!
//! ```ignore
//! use idsvc_auth::token::jwt::{JwtSigner, SigningAlgorithm, SigningKeyPair};
//!
//! let key_pair = SigningKeyPair::generate_rsa("key-1", SigningAlgorithm::RS256)?;
//! let signer = JwtSigner::new("https://idp.example.com");
//!
//! let token = signer.sign(&key_pair, &payload)?;
//! let claims = signer.verify(&token, [&key_pair], OffsetDateTime::now_utc())?;
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use p384::SecretKey as EcSecretKey;
use p384::ecdsa::SigningKey as EcSigningKey;
use p384::pkcs8::{DecodePrivateKey as EcDecodePrivateKey, EncodePrivateKey as EcEncodePrivateKey};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

const RSA_KEY_BITS: usize = 2048;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while signing, verifying or loading keys.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The token is not a well-formed JWS.
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token has expired")]
    Expired,

    #[error("signature does not verify")]
    BadSignature,

    /// A registered claim (`iss`, `nbf`, ...) failed validation.
    #[error("claim rejected: {0}")]
    ClaimRejected(String),

    /// No verification key carries the token's `kid`.
    #[error("no verification key with kid '{0}'")]
    UnknownKey(String),

    /// Key material could not be generated, parsed or used.
    #[error("key material: {0}")]
    Key(String),

    #[error("signing failed: {0}")]
    Sign(String),
}

impl JwtError {
    fn key(error: impl fmt::Display) -> Self {
        Self::Key(error.to_string())
    }

    /// Returns `true` when the token itself was rejected, as opposed to a
    /// failure of the local key material.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_)
                | Self::Expired
                | Self::BadSignature
                | Self::ClaimRejected(_)
                | Self::UnknownKey(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::BadSignature,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => Self::ClaimRejected(err.to_string()),
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidEcdsaKey | ErrorKind::InvalidKeyFormat => {
                Self::key(err)
            }
            _ => Self::Malformed(err.to_string()),
        }
    }
}

impl From<JwtError> for crate::AuthError {
    fn from(err: JwtError) -> Self {
        if err.is_rejection() {
            Self::invalid_token(err.to_string())
        } else {
            Self::signing(err.to_string())
        }
    }
}

// ============================================================================
// Algorithms
// ============================================================================

/// JWS algorithms the issuer signs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    RS256,
    RS384,
    RS512,
    /// ECDSA over P-384.
    ES384,
}

impl SigningAlgorithm {
    /// Name used in the `alg` header and JWK member.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::ES384 => "ES384",
        }
    }

    #[must_use]
    pub fn is_rsa(&self) -> bool {
        !self.is_ec()
    }

    #[must_use]
    pub fn is_ec(&self) -> bool {
        *self == Self::ES384
    }

    /// Digest size of the algorithm, which also sizes `c_hash`/`at_hash`.
    #[must_use]
    pub fn hash_bits(&self) -> u16 {
        match self {
            Self::RS256 => 256,
            Self::RS384 | Self::ES384 => 384,
            Self::RS512 => 512,
        }
    }
}

impl From<SigningAlgorithm> for Algorithm {
    fn from(algorithm: SigningAlgorithm) -> Self {
        match algorithm {
            SigningAlgorithm::RS256 => Self::RS256,
            SigningAlgorithm::RS384 => Self::RS384,
            SigningAlgorithm::RS512 => Self::RS512,
            SigningAlgorithm::ES384 => Self::ES384,
        }
    }
}

impl FromStr for SigningAlgorithm {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        [Self::RS256, Self::RS384, Self::RS512, Self::ES384]
            .into_iter()
            .find(|algorithm| algorithm.as_str() == name)
            .ok_or_else(|| format!("unsupported signing algorithm '{name}'"))
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// JWKS
// ============================================================================

/// A published JSON Web Key Set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

impl FromIterator<Jwk> for Jwks {
    fn from_iter<I: IntoIterator<Item = Jwk>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

/// A public signing key in JWK form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kid: String,

    /// Always `sig`.
    #[serde(rename = "use")]
    pub key_use: String,

    pub alg: String,

    /// Key type (`kty`) and its public parameters.
    #[serde(flatten)]
    pub params: JwkParams,
}

/// Public key parameters, tagged by `kty`. Values are base64url without padding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum JwkParams {
    #[serde(rename = "RSA")]
    Rsa { n: String, e: String },
    #[serde(rename = "EC")]
    Ec { crv: String, x: String, y: String },
}

// ============================================================================
// Key material
// ============================================================================

/// PEM-encoded private and public halves of a key.
#[derive(Debug, Clone)]
pub struct PemKeyPair {
    /// PKCS#8 private key.
    pub private_pem: String,
    /// SubjectPublicKeyInfo public key.
    pub public_pem: String,
}

impl PemKeyPair {
    /// Generates a fresh key for `algorithm`: 2048-bit RSA or P-384.
    ///
    /// # Errors
    /// Returns an error if generation or PEM encoding fails.
    pub fn generate(algorithm: SigningAlgorithm) -> Result<Self, JwtError> {
        let (private_pem, public_pem) = if algorithm.is_ec() {
            let secret = EcSecretKey::random(&mut OsRng);
            let private_pem =
                EcEncodePrivateKey::to_pkcs8_pem(&secret, LineEnding::LF).map_err(JwtError::key)?;
            let public_pem =
                p384::pkcs8::EncodePublicKey::to_public_key_pem(&secret.public_key(), LineEnding::LF)
                    .map_err(JwtError::key)?;
            (private_pem.to_string(), public_pem)
        } else {
            let secret = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(JwtError::key)?;
            let private_pem = secret.to_pkcs8_pem(LineEnding::LF).map_err(JwtError::key)?;
            let public_pem =
                rsa::pkcs8::EncodePublicKey::to_public_key_pem(&secret.to_public_key(), LineEnding::LF)
                    .map_err(JwtError::key)?;
            (private_pem.to_string(), public_pem)
        };

        Ok(Self {
            private_pem,
            public_pem,
        })
    }
}

/// A private signing key with its verification half and JWK parameters.
pub struct SigningKeyPair {
    pub kid: String,
    pub algorithm: SigningAlgorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    params: JwkParams,
}

impl fmt::Debug for SigningKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeyPair")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKeyPair {
    /// Generates an RSA key for an `RS*` algorithm.
    ///
    /// # Errors
    /// Returns an error if `algorithm` is not RSA-based or generation fails.
    pub fn generate_rsa(kid: impl Into<String>, algorithm: SigningAlgorithm) -> Result<Self, JwtError> {
        if !algorithm.is_rsa() {
            return Err(JwtError::Key(format!("{algorithm} is not an RSA algorithm")));
        }
        let pem = PemKeyPair::generate(algorithm)?;
        Self::from_pem(kid, algorithm, &pem.private_pem, &pem.public_pem)
    }

    /// Generates a P-384 key for ES384.
    ///
    /// # Errors
    /// Returns an error if the key cannot be encoded.
    pub fn generate_ec(kid: impl Into<String>) -> Result<Self, JwtError> {
        Self::from_ec_secret(kid.into(), &EcSecretKey::random(&mut OsRng))
    }

    /// Loads a key from PEM.
    ///
    /// RSA private keys may be PKCS#1 or PKCS#8; EC private keys may be SEC1
    /// or PKCS#8. For EC keys the public half is derived from the private key
    /// and `public_pem` is ignored.
    ///
    /// # Errors
    /// Returns an error if the PEM data is invalid.
    pub fn from_pem(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, JwtError> {
        if algorithm.is_ec() {
            let secret = EcSecretKey::from_pkcs8_pem(private_pem)
                .or_else(|_| EcSecretKey::from_sec1_pem(private_pem))
                .map_err(JwtError::key)?;
            return Self::from_ec_secret(kid.into(), &secret);
        }

        let public = RsaPublicKey::from_public_key_pem(public_pem).map_err(JwtError::key)?;
        Ok(Self {
            kid: kid.into(),
            algorithm,
            encoding_key: EncodingKey::from_rsa_pem(private_pem.as_bytes())?,
            decoding_key: DecodingKey::from_rsa_pem(public_pem.as_bytes())?,
            params: JwkParams::Rsa {
                n: URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
                e: URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
            },
        })
    }

    fn from_ec_secret(kid: String, secret: &EcSecretKey) -> Result<Self, JwtError> {
        let point = EcSigningKey::from(secret)
            .verifying_key()
            .to_encoded_point(false);
        let (Some(x), Some(y)) = (point.x(), point.y()) else {
            return Err(JwtError::Key("EC public point is not uncompressed".to_string()));
        };
        let x = URL_SAFE_NO_PAD.encode(x);
        let y = URL_SAFE_NO_PAD.encode(y);

        // jsonwebtoken reads EC private keys only as PKCS#8
        let private_pem =
            EcEncodePrivateKey::to_pkcs8_pem(secret, LineEnding::LF).map_err(JwtError::key)?;

        Ok(Self {
            kid,
            algorithm: SigningAlgorithm::ES384,
            encoding_key: EncodingKey::from_ec_pem(private_pem.as_bytes())?,
            decoding_key: DecodingKey::from_ec_components(&x, &y)?,
            params: JwkParams::Ec {
                crv: "P-384".to_string(),
                x,
                y,
            },
        })
    }

    /// The public half as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kid: self.kid.clone(),
            key_use: "sig".to_string(),
            alg: self.algorithm.to_string(),
            params: self.params.clone(),
        }
    }
}

// ============================================================================
// Signer
// ============================================================================

/// Claim payload of a signed token.
pub type JwtPayload = Map<String, Value>;

/// Signs claim payloads and verifies signed tokens for one issuer.
///
/// The signer never adds claims of its own: `jti`, `iat` and the other
/// registered claims must already be present in the payload.
#[derive(Debug, Clone)]
pub struct JwtSigner {
    issuer: String,
}

impl JwtSigner {
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Encodes the payload as a compact JWS whose header names the key's `kid`.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn sign(&self, key: &SigningKeyPair, payload: &JwtPayload) -> Result<String, JwtError> {
        let mut header = Header::new(key.algorithm.into());
        header.kid = Some(key.kid.clone());
        jsonwebtoken::encode(&header, payload, &key.encoding_key)
            .map_err(|e| JwtError::Sign(e.to_string()))
    }

    /// Verifies a token against the key named by its `kid` header.
    ///
    /// Checks the signature and issuer, then `exp` and `nbf` against `now`
    /// allowing [`CLOCK_SKEW`]. The audience is left to the caller.
    ///
    /// # Errors
    /// Returns an error if no key matches or validation fails.
    pub fn verify<'a>(
        &self,
        token: &str,
        keys: impl IntoIterator<Item = &'a SigningKeyPair>,
        now: OffsetDateTime,
    ) -> Result<JwtPayload, JwtError> {
        let kid = jsonwebtoken::decode_header(token)?
            .kid
            .ok_or_else(|| JwtError::Malformed("header carries no kid".to_string()))?;
        let key = keys
            .into_iter()
            .find(|k| k.kid == kid)
            .ok_or(JwtError::UnknownKey(kid))?;

        let mut validation = Validation::new(key.algorithm.into());
        validation.set_issuer(&[&self.issuer]);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        let claims = jsonwebtoken::decode::<JwtPayload>(token, &key.decoding_key, &validation)?.claims;
        check_lifetime(&claims, now)?;
        Ok(claims)
    }
}

/// Leeway applied to `exp` and `nbf`.
pub const CLOCK_SKEW: i64 = 60;

fn check_lifetime(claims: &JwtPayload, now: OffsetDateTime) -> Result<(), JwtError> {
    let now = now.unix_timestamp();
    let timestamp = |name: &str| match claims.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| JwtError::ClaimRejected(format!("{name} is not a number"))),
    };

    match timestamp("exp")? {
        Some(exp) if exp < now - CLOCK_SKEW => return Err(JwtError::Expired),
        Some(_) => {}
        None => return Err(JwtError::ClaimRejected("exp is missing".to_string())),
    }
    if let Some(nbf) = timestamp("nbf")? {
        if nbf > now + CLOCK_SKEW {
            return Err(JwtError::ClaimRejected("token is not valid yet".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
