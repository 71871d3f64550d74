//! Client application registration.

use serde::{Deserialize, Serialize};

use crate::types::claims::Claim;
use crate::types::scope::ApplicationScope;

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types an application may use at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization Code flow.
    AuthorizationCode,
    /// Client Credentials flow (confidential applications only).
    ClientCredentials,
    /// Refresh Token flow.
    RefreshToken,
}

impl GrantType {
    /// Returns the OAuth 2.0 `grant_type` parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }

    /// Parses a `grant_type` parameter value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(Self::AuthorizationCode),
            "client_credentials" => Some(Self::ClientCredentials),
            "refresh_token" => Some(Self::RefreshToken),
            _ => None,
        }
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Application
// =============================================================================

/// A registered client application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// Store identifier.
    pub id: String,

    /// Client identifier used in protocol requests.
    pub client_id: String,

    /// Human-readable name.
    pub name: String,

    /// Argon2 hash of the client secret; `None` for public applications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret_hash: Option<String>,

    /// Grant types the application may use.
    pub grant_types: Vec<GrantType>,

    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,

    /// Registered post-logout redirect URIs.
    #[serde(default)]
    pub logout_redirect_uris: Vec<String>,

    /// Scopes the application may request, canonical or owned by a resource.
    #[serde(default)]
    pub scopes: Vec<ApplicationScope>,

    /// Additional claims placed on the application identity.
    #[serde(default)]
    pub claims: Vec<Claim>,

    /// Optimistic concurrency stamp, replaced on every update.
    #[serde(default)]
    pub concurrency_stamp: String,
}

impl Application {
    /// Validates the registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is inconsistent.
    pub fn validate(&self) -> Result<(), ApplicationValidationError> {
        if self.client_id.is_empty() {
            return Err(ApplicationValidationError::EmptyClientId);
        }

        if self.name.is_empty() {
            return Err(ApplicationValidationError::EmptyName);
        }

        if self.grant_types.is_empty() {
            return Err(ApplicationValidationError::NoGrantTypes);
        }

        if !self.is_confidential() && self.grant_types.contains(&GrantType::ClientCredentials) {
            return Err(ApplicationValidationError::PublicClientCredentials);
        }

        if self.grant_types.contains(&GrantType::AuthorizationCode) && self.redirect_uris.is_empty()
        {
            return Err(ApplicationValidationError::NoRedirectUris);
        }

        for uri in self.redirect_uris.iter().chain(&self.logout_redirect_uris) {
            if !is_absolute_without_fragment(uri) {
                return Err(ApplicationValidationError::InvalidUri(uri.clone()));
            }
        }

        Ok(())
    }

    /// Returns `true` if the application authenticates with a secret.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        self.client_secret_hash.is_some()
    }

    /// Checks whether the redirect URI is registered.
    #[must_use]
    pub fn is_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks whether the post-logout redirect URI is registered.
    #[must_use]
    pub fn is_logout_redirect_uri_allowed(&self, uri: &str) -> bool {
        self.logout_redirect_uris.iter().any(|allowed| allowed == uri)
    }

    /// Checks whether the grant type is allowed.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Resolves a requested scope value against the registration.
    ///
    /// Canonical scope names always resolve; any other value must be registered
    /// on the application, which records its owner.
    #[must_use]
    pub fn resolve_scope(&self, name: &str) -> Option<ApplicationScope> {
        ApplicationScope::canonical(name)
            .or_else(|| self.scopes.iter().find(|s| s.name == name).cloned())
    }
}

/// Returns `true` for absolute URIs without a fragment component.
#[must_use]
pub fn is_absolute_without_fragment(uri: &str) -> bool {
    url::Url::parse(uri).is_ok_and(|u| u.fragment().is_none())
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during application validation.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// Application name cannot be empty.
    #[error("Application name cannot be empty")]
    EmptyName,

    /// At least one grant type is required.
    #[error("At least one grant type is required")]
    NoGrantTypes,

    /// Public applications cannot use the client_credentials grant.
    #[error("Public applications cannot use client_credentials grant")]
    PublicClientCredentials,

    /// Authorization code flow requires redirect URIs.
    #[error("Authorization code flow requires redirect URIs")]
    NoRedirectUris,

    /// A registered URI is relative or carries a fragment.
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
}
