//! Signed access token issuer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::claims::{TokenClaimsManager, TokenGeneratingContext};
use crate::clock::Clock;
use crate::issuers::TokenIssuer;
use crate::issuers::jwt::JwtTokenSigner;
use crate::signing::SigningCredentialsPolicy;
use crate::token::{JwtPayload, JwtSigner, TokenKind};

/// Issues access tokens as JWS compact strings.
#[derive(Debug, Clone)]
pub struct JwtAccessTokenIssuer {
    inner: JwtTokenSigner,
}

impl JwtAccessTokenIssuer {
    #[must_use]
    pub fn new(
        claims: TokenClaimsManager,
        policy: SigningCredentialsPolicy,
        signer: JwtSigner,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: JwtTokenSigner::new(claims, policy, signer, clock),
        }
    }

    /// Verifies an access token against the published credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`](crate::AuthError::InvalidToken) or
    /// [`AuthError::TokenExpired`](crate::AuthError::TokenExpired) if the token
    /// does not verify.
    pub async fn verify(&self, access_token: &str) -> AuthResult<JwtPayload> {
        self.inner
            .policy()
            .verify(self.inner.signer(), access_token, self.inner.now())
            .await
    }
}

#[async_trait]
impl TokenIssuer for JwtAccessTokenIssuer {
    fn kind(&self) -> TokenKind {
        TokenKind::AccessToken
    }

    async fn issue(&self, context: &mut TokenGeneratingContext) -> AuthResult<String> {
        self.inner.sign(context, &[]).await
    }
}
