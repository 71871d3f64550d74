//! Signed ID token issuer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::claims::{TokenClaimsManager, TokenGeneratingContext};
use crate::clock::Clock;
use crate::issuers::TokenIssuer;
use crate::issuers::jwt::JwtTokenSigner;
use crate::signing::SigningCredentialsPolicy;
use crate::token::{JwtPayload, JwtSigner, TokenKind};
use crate::types::claims::claim_types;

/// Claims an ID token carries verbatim.
const LITERAL_CLAIMS: [&str; 3] = [
    claim_types::NONCE,
    claim_types::CODE_HASH,
    claim_types::ACCESS_TOKEN_HASH,
];

/// Issues OpenID Connect ID tokens as JWS compact strings.
///
/// When a code or access token was issued earlier in the same request, the
/// ID token binds it with `c_hash`/`at_hash`.
#[derive(Debug, Clone)]
pub struct JwtIdTokenIssuer {
    inner: JwtTokenSigner,
}

impl JwtIdTokenIssuer {
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

    /// Verifies an ID token against the published credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the token does not verify.
    pub async fn verify(&self, id_token: &str) -> AuthResult<JwtPayload> {
        self.inner
            .policy()
            .verify(self.inner.signer(), id_token, self.inner.now())
            .await
    }
}

#[async_trait]
impl TokenIssuer for JwtIdTokenIssuer {
    fn kind(&self) -> TokenKind {
        TokenKind::IdToken
    }

    async fn issue(&self, context: &mut TokenGeneratingContext) -> AuthResult<String> {
        self.inner.sign(context, &LITERAL_CLAIMS).await
    }
}
