//! Refresh token issuer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::claims::{RequestGrants, TokenClaimsManager, TokenGeneratingContext};
use crate::clock::Clock;
use crate::issuers::{TokenIssuer, protect_token, read_protected};
use crate::oauth::parameters::names;
use crate::protection::{TokenProtector, purposes};
use crate::token::TokenKind;

/// Issues refresh tokens as protected tokens and reads them back.
///
/// Refresh tokens are not stored: a presented token is valid as long as it
/// unprotects and is inside its validity window.
#[derive(Clone)]
pub struct RefreshTokenIssuer {
    claims: TokenClaimsManager,
    protector: Arc<dyn TokenProtector>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RefreshTokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenIssuer")
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

impl RefreshTokenIssuer {
    #[must_use]
    pub fn new(
        claims: TokenClaimsManager,
        protector: Arc<dyn TokenProtector>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            claims,
            protector,
            clock,
        }
    }

    /// Reads a presented refresh token and returns the grants it records.
    ///
    /// Scope names resolve to canonical scopes or to scopes owned by the
    /// token's `resource`. The token itself becomes the claim source of the
    /// tokens issued in exchange.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`](crate::AuthError::InvalidToken) if
    /// the token cannot be unprotected and
    /// [`AuthError::TokenExpired`](crate::AuthError::TokenExpired) once it has
    /// expired.
    pub fn exchange_refresh_token(&self, refresh_token: &str) -> AuthResult<RequestGrants> {
        let token = read_protected(
            self.protector.as_ref(),
            purposes::REFRESH_TOKEN,
            TokenKind::RefreshToken,
            names::REFRESH_TOKEN,
            refresh_token,
            self.clock.now(),
        )?;
        Ok(RequestGrants::from_token(token))
    }
}

#[async_trait]
impl TokenIssuer for RefreshTokenIssuer {
    fn kind(&self) -> TokenKind {
        TokenKind::RefreshToken
    }

    async fn issue(&self, context: &mut TokenGeneratingContext) -> AuthResult<String> {
        protect_token(
            &self.claims,
            self.protector.as_ref(),
            purposes::REFRESH_TOKEN,
            context,
        )
    }
}
