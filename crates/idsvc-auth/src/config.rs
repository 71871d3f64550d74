//! Token issuance configuration.
//!
//! Configuration is organized into sections for token mappings and lifetimes,
//! signing credentials, opaque token protection and the login session schemes.
//! Every section has working defaults, so an empty document yields a usable
//! development configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::token::{SigningAlgorithm, TokenKind};
use crate::types::claims::{claim_types, principal_claim_types};

/// Longest accepted token lifetime offset.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

/// Root configuration.
///
/// # Example (TOML)
///
/// ```toml
/// issuer = "https://idp.example.com"
///
/// [tokens.access_token]
/// not_valid_after = "1h"
///
/// [signing.development]
/// directory = "./keys"
///
/// [protection]
/// key = "base64-encoded-256-bit-key"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer URL, used for the `iss` claim.
    pub issuer: String,

    /// Per-kind claim mappings and lifetimes.
    pub tokens: TokenOptions,

    /// Signing credential sources.
    pub signing: SigningConfig,

    /// Opaque token protection.
    pub protection: ProtectionConfig,

    /// Login session schemes.
    pub session: SessionConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "http://localhost:5000".to_string(),
            tokens: TokenOptions::default(),
            signing: SigningConfig::default(),
            protection: ProtectionConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

// =============================================================================
// Token options
// =============================================================================

/// Maps a claim of a principal identity onto a token claim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClaimMapping {
    /// Claim type on the user or application identity.
    pub from: String,
    /// Claim type on the token.
    pub to: String,
}

impl ClaimMapping {
    /// Creates a mapping.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Claim mappings and validity window of one token kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenMapping {
    /// Claims copied from the user identity.
    pub user_claims: Vec<ClaimMapping>,

    /// Claims copied from the application identity.
    pub application_claims: Vec<ClaimMapping>,

    /// Offset from issuance to the start of validity (`nbf`).
    #[serde(with = "humantime_serde")]
    pub not_valid_before: Duration,

    /// Offset from issuance to expiration (`exp`).
    #[serde(with = "humantime_serde")]
    pub not_valid_after: Duration,
}

impl Default for TokenMapping {
    fn default() -> Self {
        Self {
            user_claims: Vec::new(),
            application_claims: Vec::new(),
            not_valid_before: Duration::ZERO,
            not_valid_after: Duration::from_secs(3600),
        }
    }
}

/// Token options for every kind.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenOptions {
    /// Authorization code options.
    pub authorization_code: TokenMapping,

    /// Access token options.
    pub access_token: TokenMapping,

    /// ID token options.
    pub id_token: TokenMapping,

    /// Refresh token options.
    pub refresh_token: TokenMapping,

    /// Stamp the issuer on refresh tokens.
    pub refresh_token_issuer: bool,
}

impl Default for TokenOptions {
    fn default() -> Self {
        use principal_claim_types as principal;

        Self {
            authorization_code: TokenMapping {
                user_claims: vec![ClaimMapping::new(
                    principal::NAME_IDENTIFIER,
                    claim_types::USER_ID,
                )],
                application_claims: vec![ClaimMapping::new(
                    principal::CLIENT_ID,
                    claim_types::CLIENT_ID,
                )],
                not_valid_before: Duration::ZERO,
                not_valid_after: Duration::from_secs(5 * 60),
            },
            access_token: TokenMapping {
                user_claims: vec![ClaimMapping::new(
                    principal::NAME_IDENTIFIER,
                    claim_types::SUBJECT,
                )],
                application_claims: Vec::new(),
                not_valid_before: Duration::ZERO,
                not_valid_after: Duration::from_secs(2 * 3600),
            },
            id_token: TokenMapping {
                user_claims: vec![ClaimMapping::new(
                    principal::NAME_IDENTIFIER,
                    claim_types::SUBJECT,
                )],
                application_claims: vec![ClaimMapping::new(
                    principal::CLIENT_ID,
                    claim_types::AUDIENCE,
                )],
                not_valid_before: Duration::ZERO,
                not_valid_after: Duration::from_secs(2 * 3600),
            },
            refresh_token: TokenMapping {
                user_claims: vec![ClaimMapping::new(
                    principal::NAME_IDENTIFIER,
                    claim_types::USER_ID,
                )],
                application_claims: vec![ClaimMapping::new(
                    principal::CLIENT_ID,
                    claim_types::CLIENT_ID,
                )],
                not_valid_before: Duration::ZERO,
                not_valid_after: Duration::from_secs(30 * 24 * 3600),
            },
            refresh_token_issuer: false,
        }
    }
}

impl TokenOptions {
    /// Returns the options of a token kind.
    #[must_use]
    pub fn mapping(&self, kind: TokenKind) -> &TokenMapping {
        match kind {
            TokenKind::AuthorizationCode => &self.authorization_code,
            TokenKind::AccessToken => &self.access_token,
            TokenKind::IdToken => &self.id_token,
            TokenKind::RefreshToken => &self.refresh_token,
        }
    }
}

// =============================================================================
// Signing
// =============================================================================

/// Signing credential configuration.
///
/// Configured keys are consulted first, in order, then the development
/// directory if one is set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Explicitly configured keys.
    pub keys: Vec<SigningKeyConfig>,

    /// Development key directory.
    pub development: Option<DevelopmentSigningConfig>,
}

/// A configured signing key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SigningKeyConfig {
    /// Key ID published in the JWKS and token headers.
    pub kid: String,

    /// Signing algorithm: "RS256", "RS384", "RS512" or "ES384".
    pub algorithm: String,

    /// Path to the PEM private key.
    pub private_key_path: PathBuf,

    /// Path to the PEM public key.
    pub public_key_path: PathBuf,

    /// Start of the validity window; unbounded when absent.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub not_before: Option<OffsetDateTime>,

    /// End of the validity window (exclusive); unbounded when absent.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,
}

/// Development key directory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DevelopmentSigningConfig {
    /// Directory holding the development key pair.
    pub directory: PathBuf,

    /// Algorithm of the development key.
    pub algorithm: String,

    /// Generate the key pair when the directory holds none.
    pub create_if_missing: bool,
}

impl Default for DevelopmentSigningConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".idsvc/keys"),
            algorithm: "RS256".to_string(),
            create_if_missing: true,
        }
    }
}

/// Parses a signing algorithm name.
///
/// # Errors
///
/// Returns an error for unsupported algorithms.
pub fn parse_algorithm(name: &str) -> Result<SigningAlgorithm, ConfigError> {
    name.parse().map_err(ConfigError::InvalidValue)
}

// =============================================================================
// Protection and session
// =============================================================================

/// Opaque token protection configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Hex or base64 encoded 256-bit master key.
    ///
    /// When absent a random key is generated at startup, so codes and refresh
    /// tokens do not survive a restart.
    pub key: Option<String>,
}

/// Authentication scheme names used by the login engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Scheme holding the ambient login identity.
    pub login_scheme: String,

    /// Scheme holding the per-application session identities.
    pub session_scheme: String,

    /// Schemes signed out of on logout.
    pub sign_out_schemes: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            login_scheme: "idsvc.login".to_string(),
            session_scheme: "idsvc.session".to_string(),
            sign_out_schemes: vec!["idsvc.login".to_string(), "idsvc.session".to_string()],
        }
    }
}

// =============================================================================
// Loading and validation
// =============================================================================

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A value is out of range or malformed.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required value is absent.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<ConfigError> for crate::AuthError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}

impl AuthConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if url::Url::parse(&self.issuer).is_err() {
            return Err(ConfigError::InvalidValue(format!(
                "issuer must be an absolute URL, got '{}'",
                self.issuer
            )));
        }

        for kind in TokenKind::ALL {
            let mapping = self.tokens.mapping(kind);
            if mapping.not_valid_after <= mapping.not_valid_before {
                return Err(ConfigError::InvalidValue(format!(
                    "{kind} not_valid_after must be greater than not_valid_before"
                )));
            }
            if mapping.not_valid_after > MAX_TOKEN_LIFETIME {
                return Err(ConfigError::InvalidValue(format!(
                    "{kind} not_valid_after exceeds {} days",
                    MAX_TOKEN_LIFETIME.as_secs() / 86_400
                )));
            }
        }

        for key in &self.signing.keys {
            if key.kid.is_empty() {
                return Err(ConfigError::Missing("signing key kid".to_string()));
            }
            parse_algorithm(&key.algorithm)?;
            if let (Some(not_before), Some(expires)) = (key.not_before, key.expires) {
                if expires <= not_before {
                    return Err(ConfigError::InvalidValue(format!(
                        "signing key '{}' expires before it becomes valid",
                        key.kid
                    )));
                }
            }
        }

        if let Some(development) = &self.signing.development {
            parse_algorithm(&development.algorithm)?;
        }

        if let Some(key) = &self.protection.key {
            crate::protection::parse_key(key)
                .map_err(|e| ConfigError::InvalidValue(format!("protection key: {e}")))?;
        }

        if self.session.login_scheme.is_empty() || self.session.session_scheme.is_empty() {
            return Err(ConfigError::Missing("session scheme names".to_string()));
        }

        if self.session.login_scheme == self.session.session_scheme {
            return Err(ConfigError::InvalidValue(
                "login_scheme and session_scheme must differ".to_string(),
            ));
        }

        Ok(())
    }
}
