//! Token issuance error types.
//!
//! This module defines the errors that can occur while validating requests,
//! generating claims, issuing tokens and reading tokens back.

use std::fmt;

use crate::oauth::errors::ProtocolError;
use crate::token::model::TokenError;

/// Errors returned by the issuance engine.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request was rejected with a protocol error from the catalog.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A presented token could not be unprotected or verified.
    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    /// A presented token is outside of its validity window.
    #[error("Token expired")]
    TokenExpired,

    /// A claim set does not satisfy the invariants of its token kind.
    #[error("Invalid claims: {0}")]
    InvalidClaims(#[from] TokenError),

    /// No signing credential is valid at the current time.
    #[error("No valid signing credentials are available")]
    NoSigningCredentials,

    /// Producing or verifying a signature failed.
    #[error("Signing error: {message}")]
    Signing { message: String },

    /// Encrypting an opaque token failed.
    #[error("Protection error: {message}")]
    Protection { message: String },

    /// An error occurred while reading or writing the stores.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An internal invariant was violated, such as generating claims twice.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AuthError {
    #[must_use]
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn protection(message: impl Into<String>) -> Self {
        Self::Protection {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller is at fault (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Protocol(_) | Self::InvalidToken { .. } | Self::TokenExpired
        )
    }

    /// The issuer, not the caller, is at fault.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// A presented or generated token was rejected.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken { .. } | Self::TokenExpired | Self::InvalidClaims(_)
        )
    }

    /// Coarse grouping for log fields.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Protocol(_) => ErrorCategory::Validation,
            Self::InvalidToken { .. } => ErrorCategory::Token,
            Self::TokenExpired => ErrorCategory::Token,
            Self::InvalidClaims(_) => ErrorCategory::Issuance,
            Self::NoSigningCredentials => ErrorCategory::Credentials,
            Self::Signing { .. } => ErrorCategory::Credentials,
            Self::Protection { .. } => ErrorCategory::Credentials,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// The `error` parameter an endpoint responds with.
    #[must_use]
    pub fn oauth_error_code(&self) -> &str {
        match self {
            Self::Protocol(error) => &error.error,
            Self::InvalidToken { .. } | Self::TokenExpired => "invalid_request",
            _ => "server_error",
        }
    }

    /// Maps the error to the protocol error returned to the caller.
    ///
    /// `parameter` names the token parameter that was being read, so a failed
    /// unprotect surfaces as "the 'code' is invalid" without exposing the cause.
    #[must_use]
    pub fn to_protocol_error(&self, parameter: &str) -> ProtocolError {
        match self {
            Self::Protocol(error) => error.clone(),
            Self::InvalidToken { .. } => ProtocolError::invalid_token(parameter),
            Self::TokenExpired => ProtocolError::token_expired(parameter),
            _ => ProtocolError {
                error: "server_error".to_string(),
                error_description: None,
                error_uri: None,
            },
        }
    }
}

/// Coarse error grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request validation errors.
    Validation,
    /// Presented token errors.
    Token,
    /// Token construction errors.
    Issuance,
    /// Signing and protection key errors.
    Credentials,
    /// Store failures.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Broken internal invariants.
    Internal,
}

impl ErrorCategory {
    /// Label used in the `category` field of log events.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Token => "token",
            Self::Issuance => "issuance",
            Self::Credentials => "credentials",
            Self::Infrastructure => "infrastructure",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
