//! Token endpoint request validation and responses.
//!
//! # Supported Grant Types
//!
//! - `authorization_code` - Exchange an authorization code for tokens
//! - `refresh_token` - Exchange a refresh token for new tokens
//! - `client_credentials` - Machine-to-machine access token

use serde::Serialize;

use crate::claims::context::IssuedTokens;
use crate::client_secret::verify_client_secret;
use crate::oauth::errors::ProtocolError;
use crate::oauth::parameters::{Parameters, names};
use crate::oauth::pkce::verify_code_verifier;
use crate::token::Token;
use crate::types::claims::claim_types;
use crate::types::{Application, GrantType};

/// The grant-specific part of a token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    AuthorizationCode {
        code: String,
        redirect_uri: String,
        code_verifier: Option<String>,
    },
    RefreshToken {
        refresh_token: String,
    },
    ClientCredentials {
        scope: Option<String>,
    },
}

/// A parsed token request.
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub grant: TokenGrant,
    /// The raw parameters, kept for the claim providers.
    pub parameters: Parameters,
}

impl TokenRequest {
    /// Parses a token request.
    ///
    /// # Errors
    ///
    /// Returns a catalog error for unknown grant types and missing or
    /// repeated parameters.
    pub fn from_parameters(parameters: Parameters) -> Result<Self, ProtocolError> {
        let grant_type = parameters.required(names::GRANT_TYPE)?;
        let grant_type =
            GrantType::parse(grant_type).ok_or_else(|| ProtocolError::invalid_grant_type(grant_type))?;

        let client_id = parameters.required(names::CLIENT_ID)?.to_string();
        let client_secret = parameters.single(names::CLIENT_SECRET)?.map(str::to_string);

        let grant = match grant_type {
            GrantType::AuthorizationCode => TokenGrant::AuthorizationCode {
                code: parameters.required(names::CODE)?.to_string(),
                redirect_uri: parameters.required(names::REDIRECT_URI)?.to_string(),
                code_verifier: parameters.single(names::CODE_VERIFIER)?.map(str::to_string),
            },
            GrantType::RefreshToken => TokenGrant::RefreshToken {
                refresh_token: parameters.required(names::REFRESH_TOKEN)?.to_string(),
            },
            GrantType::ClientCredentials => TokenGrant::ClientCredentials {
                scope: parameters.single(names::SCOPE)?.map(str::to_string),
            },
        };

        Ok(Self {
            client_id,
            client_secret,
            grant,
            parameters,
        })
    }

    /// The grant type of the request.
    #[must_use]
    pub fn grant_type(&self) -> GrantType {
        match self.grant {
            TokenGrant::AuthorizationCode { .. } => GrantType::AuthorizationCode,
            TokenGrant::RefreshToken { .. } => GrantType::RefreshToken,
            TokenGrant::ClientCredentials { .. } => GrantType::ClientCredentials,
        }
    }

    /// Authenticates the client and checks it may use the grant type.
    ///
    /// Confidential applications must present their secret; public
    /// applications must not present one.
    ///
    /// # Errors
    ///
    /// Returns a catalog error if authentication fails.
    pub fn authenticate_client(&self, application: &Application) -> Result<(), ProtocolError> {
        if application.client_id != self.client_id {
            return Err(ProtocolError::invalid_client_id(&self.client_id));
        }

        let grant_type = self.grant_type();
        if !application.is_grant_type_allowed(grant_type) {
            return Err(ProtocolError::invalid_grant_type(grant_type.as_str()));
        }

        match (&application.client_secret_hash, &self.client_secret) {
            (Some(hash), Some(secret)) => match verify_client_secret(secret, hash) {
                Ok(true) => Ok(()),
                Ok(false) => Err(ProtocolError::invalid_client_credentials()),
                Err(e) => {
                    tracing::warn!(
                        client_id = %self.client_id,
                        error = %e,
                        "Stored client secret hash is malformed"
                    );
                    Err(ProtocolError::invalid_client_credentials())
                }
            },
            (None, None) => Ok(()),
            _ => Err(ProtocolError::invalid_client_credentials()),
        }
    }

    /// Checks an unprotected authorization code against this request.
    ///
    /// # Errors
    ///
    /// Returns a catalog error if the code was issued to another client or
    /// redirect URI, or the PKCE verifier is missing or wrong.
    pub fn validate_code(&self, code: &Token) -> Result<(), ProtocolError> {
        let TokenGrant::AuthorizationCode {
            redirect_uri,
            code_verifier,
            ..
        } = &self.grant
        else {
            return Err(ProtocolError::invalid_grant());
        };

        if code.client_id() != Some(self.client_id.as_str()) {
            return Err(ProtocolError::invalid_authorization_code());
        }

        if code.redirect_uri().is_some_and(|uri| uri != redirect_uri) {
            return Err(ProtocolError::mismatching_redirect_uri());
        }

        match (code.find_first(claim_types::CODE_CHALLENGE), code_verifier) {
            (Some(challenge), Some(verifier)) => verify_code_verifier(
                challenge,
                code.find_first(claim_types::CODE_CHALLENGE_METHOD),
                verifier,
            ),
            (Some(_), None) => Err(ProtocolError::missing_code_verifier()),
            (None, Some(_)) => Err(ProtocolError::invalid_code_verifier()),
            (None, None) => Ok(()),
        }
    }

    /// Checks an unprotected refresh token against this request.
    ///
    /// # Errors
    ///
    /// Returns a catalog error if the token was issued to another client.
    pub fn validate_refresh_token(&self, token: &Token) -> Result<(), ProtocolError> {
        if token.client_id() != Some(self.client_id.as_str()) {
            return Err(ProtocolError::invalid_grant());
        }
        Ok(())
    }
}

/// Successful token response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,

    /// Always "Bearer".
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Builds the response from the tokens issued for the request.
    ///
    /// Returns `None` if no access token was issued.
    #[must_use]
    pub fn from_issued(issued: IssuedTokens, expires_in: u64) -> Option<Self> {
        Some(Self {
            access_token: issued.access_token?,
            token_type: "Bearer".to_string(),
            expires_in,
            id_token: issued.id_token,
            refresh_token: issued.refresh_token,
        })
    }
}
