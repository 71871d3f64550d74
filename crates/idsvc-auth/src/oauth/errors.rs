//! Protocol error catalog.
//!
//! Every rejection the authorization and token endpoints can produce is built
//! through one of the named constructors on [`ProtocolError`]. Callers never
//! assemble error codes or descriptions by hand, which keeps the wording of
//! the `error_description` parameter stable across the crate.
//!
//! All errors carry the `invalid_request` code except [`ProtocolError::login_required`],
//! which uses the OpenID Connect `login_required` code so relying parties can
//! distinguish a silent-authentication failure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `invalid_request` error code.
pub const INVALID_REQUEST: &str = "invalid_request";

/// `login_required` error code (OpenID Connect Core 3.1.2.6).
pub const LOGIN_REQUIRED: &str = "login_required";

/// An OAuth 2.0 / OpenID Connect protocol error.
///
/// Serializes to the `error`, `error_description` and `error_uri` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolError {
    /// Error code.
    pub error: String,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI of a page documenting the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(description) => write!(f, "{}: {}", self.error, description),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    fn invalid_request(description: impl Into<String>) -> Self {
        Self {
            error: INVALID_REQUEST.to_string(),
            error_description: Some(description.into()),
            error_uri: None,
        }
    }

    /// Attaches an `error_uri`.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.error_uri = Some(uri.into());
        self
    }

    /// Returns `true` if this is the `login_required` error.
    #[must_use]
    pub fn is_login_required(&self) -> bool {
        self.error == LOGIN_REQUIRED
    }

    /// Returns the error as `(name, value)` parameter pairs.
    #[must_use]
    pub fn to_parameters(&self) -> Vec<(&'static str, String)> {
        let mut parameters = vec![("error", self.error.clone())];
        if let Some(description) = &self.error_description {
            parameters.push(("error_description", description.clone()));
        }
        if let Some(uri) = &self.error_uri {
            parameters.push(("error_uri", uri.clone()));
        }
        parameters
    }

    // -------------------------------------------------------------------------
    // Redirect and logout URIs
    // -------------------------------------------------------------------------

    /// The redirect URI is not registered for the client.
    #[must_use]
    pub fn invalid_redirect_uri(redirect_uri: &str) -> Self {
        Self::invalid_request(format!(
            "The redirect URI '{redirect_uri}' is not registered for this client."
        ))
    }

    /// The post-logout redirect URI is not registered for any signed-in client.
    #[must_use]
    pub fn invalid_logout_redirect_uri(logout_uri: &str) -> Self {
        Self::invalid_request(format!(
            "The post logout redirect URI '{logout_uri}' is not registered."
        ))
    }

    /// The URI is not absolute or carries a fragment.
    #[must_use]
    pub fn invalid_uri_format(uri: &str) -> Self {
        Self::invalid_request(format!(
            "The URI '{uri}' must be an absolute URI without a fragment."
        ))
    }

    /// The redirect URI of a token request does not match the authorization request.
    #[must_use]
    pub fn mismatching_redirect_uri() -> Self {
        Self::invalid_request(
            "The redirect URI does not match the one used in the authorization request.",
        )
    }

    // -------------------------------------------------------------------------
    // Clients and grants
    // -------------------------------------------------------------------------

    /// The grant type is not supported.
    #[must_use]
    pub fn invalid_grant_type(grant_type: &str) -> Self {
        Self::invalid_request(format!("The grant type '{grant_type}' is not supported."))
    }

    /// The client id is unknown.
    #[must_use]
    pub fn invalid_client_id(client_id: &str) -> Self {
        Self::invalid_request(format!("The client id '{client_id}' is invalid."))
    }

    /// The client could not be authenticated.
    #[must_use]
    pub fn invalid_client_credentials() -> Self {
        Self::invalid_request("Invalid client credentials.")
    }

    /// The authorization code is unknown, tampered with or expired.
    #[must_use]
    pub fn invalid_authorization_code() -> Self {
        Self::invalid_request("The authorization code is invalid or has expired.")
    }

    /// The presented grant cannot be used by this client.
    #[must_use]
    pub fn invalid_grant() -> Self {
        Self::invalid_request("The grant is invalid.")
    }

    /// A presented token could not be read.
    #[must_use]
    pub fn invalid_token(parameter: &str) -> Self {
        Self::invalid_request(format!("The '{parameter}' is invalid."))
    }

    /// The token lifetime ended.
    #[must_use]
    pub fn token_expired(parameter: &str) -> Self {
        Self::invalid_request(format!("The '{parameter}' has expired."))
    }

    /// The token is not valid yet.
    #[must_use]
    pub fn token_not_yet_valid(parameter: &str) -> Self {
        Self::invalid_request(format!("The '{parameter}' is not valid yet."))
    }

    // -------------------------------------------------------------------------
    // Parameters
    // -------------------------------------------------------------------------

    /// A single-valued parameter was sent more than once.
    #[must_use]
    pub fn too_many_parameters(name: &str) -> Self {
        Self::invalid_request(format!("The '{name}' parameter can only be specified once."))
    }

    /// A required parameter is absent.
    #[must_use]
    pub fn missing_required_parameter(name: &str) -> Self {
        Self::invalid_request(format!("The '{name}' parameter is missing."))
    }

    /// A parameter carries a value outside its domain.
    #[must_use]
    pub fn invalid_parameter_value(value: &str, name: &str) -> Self {
        Self::invalid_request(format!(
            "'{value}' is not a valid value for the '{name}' parameter."
        ))
    }

    /// `response_type=none` was combined with another response type.
    #[must_use]
    pub fn response_type_none_not_allowed() -> Self {
        Self::invalid_request("The 'none' response type cannot be combined with other values.")
    }

    /// The response type cannot be delivered with the requested response mode.
    #[must_use]
    pub fn invalid_response_type_mode_combination(response_type: &str, response_mode: &str) -> Self {
        Self::invalid_request(format!(
            "The response type '{response_type}' is not compatible with the response mode '{response_mode}'."
        ))
    }

    /// The `prompt` parameter carries an unknown value.
    #[must_use]
    pub fn invalid_prompt_value(value: &str) -> Self {
        Self::invalid_request(format!("'{value}' is not a valid prompt value."))
    }

    /// The `prompt` parameter repeats a value.
    #[must_use]
    pub fn duplicate_prompt_value(value: &str) -> Self {
        Self::invalid_request(format!("The prompt value '{value}' is duplicated."))
    }

    // -------------------------------------------------------------------------
    // Scopes
    // -------------------------------------------------------------------------

    /// The scope is unknown or not allowed for the client.
    #[must_use]
    pub fn invalid_scope(scope: &str) -> Self {
        Self::invalid_request(format!("The scope '{scope}' is invalid."))
    }

    /// An ID token was requested without the `openid` scope.
    #[must_use]
    pub fn missing_openid_scope() -> Self {
        Self::invalid_request("The 'openid' scope is missing.")
    }

    /// Scopes from more than one resource were requested for one access token.
    #[must_use]
    pub fn multiple_resources_not_supported(first: &str, second: &str) -> Self {
        Self::invalid_request(format!(
            "Tokens for multiple resources ('{first}', '{second}') can't be issued in a single request."
        ))
    }

    // -------------------------------------------------------------------------
    // PKCE
    // -------------------------------------------------------------------------

    /// The code challenge method is not supported.
    #[must_use]
    pub fn invalid_code_challenge_method(method: &str) -> Self {
        Self::invalid_request(format!(
            "The code challenge method '{method}' is not supported."
        ))
    }

    /// The code challenge does not have the length of a base64url SHA-256 digest.
    #[must_use]
    pub fn invalid_code_challenge_length() -> Self {
        Self::invalid_request("The code challenge must be 43 characters long.")
    }

    /// The code verifier is absent although the code carries a challenge.
    #[must_use]
    pub fn missing_code_verifier() -> Self {
        Self::invalid_request("The 'code_verifier' parameter is missing.")
    }

    /// The code verifier does not match the recorded challenge.
    #[must_use]
    pub fn invalid_code_verifier() -> Self {
        Self::invalid_request("The code verifier is not valid.")
    }

    // -------------------------------------------------------------------------
    // Login
    // -------------------------------------------------------------------------

    /// The user must authenticate but interactive prompting was forbidden.
    #[must_use]
    pub fn login_required() -> Self {
        Self {
            error: LOGIN_REQUIRED.to_string(),
            error_description: Some("The user is not logged in.".to_string()),
            error_uri: None,
        }
    }
}
