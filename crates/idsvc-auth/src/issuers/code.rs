//! Authorization code issuer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::claims::{RequestGrants, TokenClaimsManager, TokenGeneratingContext};
use crate::clock::Clock;
use crate::issuers::{TokenIssuer, protect_token, read_protected};
use crate::oauth::parameters::names;
use crate::protection::{TokenProtector, purposes};
use crate::token::{Token, TokenKind};

/// Issues authorization codes as protected tokens and reads them back.
#[derive(Clone)]
pub struct AuthorizationCodeIssuer {
    claims: TokenClaimsManager,
    protector: Arc<dyn TokenProtector>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuthorizationCodeIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationCodeIssuer")
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}

impl AuthorizationCodeIssuer {
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

    /// Reads a presented code.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`](crate::AuthError::InvalidToken) if
    /// the code cannot be unprotected and
    /// [`AuthError::TokenExpired`](crate::AuthError::TokenExpired) once it has
    /// expired.
    pub fn read_authorization_code(&self, code: &str) -> AuthResult<Token> {
        read_protected(
            self.protector.as_ref(),
            purposes::AUTHORIZATION_CODE,
            TokenKind::AuthorizationCode,
            names::CODE,
            code,
            self.clock.now(),
        )
    }

    /// Reads a presented code and returns the grants it records.
    ///
    /// # Errors
    ///
    /// See [`read_authorization_code`](Self::read_authorization_code).
    pub fn exchange_authorization_code(&self, code: &str) -> AuthResult<RequestGrants> {
        self.read_authorization_code(code)
            .map(RequestGrants::from_token)
    }
}

#[async_trait]
impl TokenIssuer for AuthorizationCodeIssuer {
    fn kind(&self) -> TokenKind {
        TokenKind::AuthorizationCode
    }

    async fn issue(&self, context: &mut TokenGeneratingContext) -> AuthResult<String> {
        protect_token(
            &self.claims,
            self.protector.as_ref(),
            purposes::AUTHORIZATION_CODE,
            context,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::providers::test_support;
    use crate::clock::FixedClock;
    use crate::config::AuthConfig;
    use crate::error::AuthError;
    use crate::oauth::parameters::Parameters;
    use crate::protection::DataProtector;
    use crate::types::ApplicationScope;
    use time::Duration;

    const NOW: i64 = 1_700_000_000;

    fn issuer(clock: Arc<FixedClock>) -> AuthorizationCodeIssuer {
        let claims = TokenClaimsManager::with_defaults(&AuthConfig::default(), clock.clone());
        AuthorizationCodeIssuer::new(claims, Arc::new(DataProtector::ephemeral()), clock)
    }

    fn context() -> TokenGeneratingContext {
        let parameters = Parameters::new()
            .with(names::NONCE, "n-1")
            .with(names::REDIRECT_URI, "https://client.example.com/cb");
        TokenGeneratingContext::new(
            TokenKind::AuthorizationCode,
            parameters,
            test_support::user(),
            test_support::application(),
            RequestGrants::new(vec![
                ApplicationScope::openid(),
                ApplicationScope::resource("api", "api.read"),
            ]),
        )
    }

    #[tokio::test]
    async fn test_issue_and_exchange() {
        let clock = Arc::new(FixedClock::at_unix(NOW));
        let issuer = issuer(clock);

        let code = issuer.issue(&mut context()).await.unwrap();
        let grants = issuer.exchange_authorization_code(&code).unwrap();

        assert_eq!(grants.user_id(), Some("user-1"));
        assert_eq!(grants.client_id(), Some("client-1"));
        assert_eq!(grants.resource(), Some("api"));
        assert!(grants.grants(TokenKind::AccessToken));
        assert!(grants.grants(TokenKind::IdToken));
        assert!(!grants.grants(TokenKind::RefreshToken));
        assert_eq!(grants.source().and_then(Token::nonce), Some("n-1"));
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let clock = Arc::new(FixedClock::at_unix(NOW));
        let issuer = issuer(clock.clone());
        let code = issuer.issue(&mut context()).await.unwrap();

        clock.advance(Duration::minutes(5));
        assert!(matches!(
            issuer.exchange_authorization_code(&code),
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_tampered_code_rejected() {
        let clock = Arc::new(FixedClock::at_unix(NOW));
        let issuer = issuer(clock);
        let mut code = issuer.issue(&mut context()).await.unwrap();
        code.push('A');

        let err = issuer.exchange_authorization_code(&code).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken { .. }));
        assert_eq!(
            err.to_protocol_error(names::CODE).error_description.as_deref(),
            Some("The 'code' is invalid.")
        );
    }

    #[tokio::test]
    async fn test_code_is_not_a_refresh_token() {
        let clock = Arc::new(FixedClock::at_unix(NOW));
        let protector: Arc<dyn TokenProtector> = Arc::new(DataProtector::ephemeral());
        let claims = TokenClaimsManager::with_defaults(&AuthConfig::default(), clock.clone());
        let codes = AuthorizationCodeIssuer::new(claims.clone(), protector.clone(), clock.clone());
        let refresh = crate::issuers::RefreshTokenIssuer::new(claims, protector, clock);

        let code = codes.issue(&mut context()).await.unwrap();
        assert!(matches!(
            refresh.exchange_refresh_token(&code),
            Err(AuthError::InvalidToken { .. })
        ));
    }
}
