//! Token issuers.
//!
//! Each issuer turns a [`TokenGeneratingContext`] into the string handed to
//! the client:
//!
//! - [`AuthorizationCodeIssuer`] - protected authorization codes
//! - [`RefreshTokenIssuer`] - protected refresh tokens
//! - [`JwtAccessTokenIssuer`] - signed access tokens
//! - [`JwtIdTokenIssuer`] - signed ID tokens
//!
//! [`TokenManager`] picks the issuers for a flow.

mod access_token;
mod code;
mod id_token;
mod jwt;
pub mod manager;
mod refresh_token;

pub use access_token::JwtAccessTokenIssuer;
pub use code::AuthorizationCodeIssuer;
pub use id_token::JwtIdTokenIssuer;
pub use manager::TokenManager;
pub use refresh_token::RefreshTokenIssuer;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::claims::{TokenClaimsManager, TokenGeneratingContext};
use crate::error::AuthError;
use crate::protection::TokenProtector;
use crate::token::{Token, TokenKind};

/// Produces the serialized form of one token kind.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// The kind of token this issuer produces.
    fn kind(&self) -> TokenKind;

    /// Runs the claims pipeline over `context` and serializes the token.
    ///
    /// # Errors
    ///
    /// Returns the first provider error, an invariant violation of the
    /// finished claim set, or a signing/protection failure.
    async fn issue(&self, context: &mut TokenGeneratingContext) -> AuthResult<String>;
}

/// Runs the pipeline and validates the finished claim set.
pub(crate) fn build_token(
    claims: &TokenClaimsManager,
    context: &mut TokenGeneratingContext,
) -> AuthResult<Token> {
    claims.generate(context)?;
    Ok(Token::new(context.kind(), context.take_claims())?)
}

/// Protects a token built from `context`.
pub(crate) fn protect_token(
    claims: &TokenClaimsManager,
    protector: &dyn TokenProtector,
    purpose: &str,
    context: &mut TokenGeneratingContext,
) -> AuthResult<String> {
    let token = build_token(claims, context)?;
    let protected = protector
        .protect(purpose, &token)
        .map_err(|e| AuthError::protection(e.to_string()))?;

    tracing::debug!(
        kind = %token.kind(),
        client_id = token.client_id().unwrap_or_default(),
        "Issued token"
    );
    Ok(protected)
}

/// Unprotects a presented token and checks its kind and validity window.
///
/// `parameter` names the request parameter that carried the token.
pub(crate) fn read_protected(
    protector: &dyn TokenProtector,
    purpose: &str,
    kind: TokenKind,
    parameter: &str,
    protected: &str,
    now: OffsetDateTime,
) -> AuthResult<Token> {
    let token = protector.unprotect(purpose, protected).map_err(|e| {
        tracing::warn!(parameter, error = %e, "Rejected protected token");
        AuthError::invalid_token(format!("The '{parameter}' could not be read"))
    })?;

    if token.kind() != kind {
        tracing::warn!(parameter, kind = %token.kind(), "Rejected token of the wrong kind");
        return Err(AuthError::invalid_token(format!(
            "The '{parameter}' is not a {kind}"
        )));
    }

    if token.is_expired(now) {
        return Err(AuthError::TokenExpired);
    }

    if token.is_not_yet_valid(now) {
        return Err(crate::oauth::errors::ProtocolError::token_not_yet_valid(parameter).into());
    }

    Ok(token)
}
