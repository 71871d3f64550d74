//! Per-token generation state.

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::parameters::Parameters;
use crate::token::jwt::SigningAlgorithm;
use crate::token::model::{Token, TokenKind};
use crate::types::claims::{Claim, Identity};
use crate::types::scope::ApplicationScope;

/// What the current request is allowed to obtain.
///
/// On an initial authorization request the grants hold the scopes resolved
/// from the request and no source token. On a code or refresh token exchange
/// they are rebuilt from the exchanged token, which is kept as the claim
/// source for the tokens issued in exchange.
#[derive(Debug, Clone, Default)]
pub struct RequestGrants {
    scopes: Vec<ApplicationScope>,
    tokens: Vec<TokenKind>,
    source: Option<Token>,
}

impl RequestGrants {
    /// Grants for a request that exchanges nothing.
    #[must_use]
    pub fn new(scopes: Vec<ApplicationScope>) -> Self {
        Self {
            scopes,
            tokens: Vec::new(),
            source: None,
        }
    }

    /// Grants recorded on an authorization code or a refresh token.
    ///
    /// Scope names resolve to canonical scopes first; any other name is owned
    /// by the token's `resource`. Names that resolve to neither are dropped.
    #[must_use]
    pub fn from_token(token: Token) -> Self {
        let resource = token.resource();
        let scopes = token
            .scopes()
            .into_iter()
            .filter_map(|name| {
                ApplicationScope::canonical(name)
                    .or_else(|| resource.map(|owner| ApplicationScope::resource(owner, name)))
            })
            .collect();
        let tokens = token.granted_tokens();

        Self {
            scopes,
            tokens,
            source: Some(token),
        }
    }

    /// Granted scopes.
    #[must_use]
    pub fn scopes(&self) -> &[ApplicationScope] {
        &self.scopes
    }

    /// Token kinds the exchanged token grants.
    #[must_use]
    pub fn tokens(&self) -> &[TokenKind] {
        &self.tokens
    }

    /// Returns `true` if the exchanged token grants `kind`.
    #[must_use]
    pub fn grants(&self, kind: TokenKind) -> bool {
        self.tokens.contains(&kind)
    }

    /// The exchanged token, if any.
    #[must_use]
    pub fn source(&self) -> Option<&Token> {
        self.source.as_ref()
    }

    /// Returns `true` for an initial authorization request.
    #[must_use]
    pub fn is_initial(&self) -> bool {
        self.source.is_none()
    }

    /// User id recorded on the exchanged token.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(Token::user_id)
    }

    /// Client id recorded on the exchanged token.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(Token::client_id)
    }

    /// Owner of the first resource-scoped scope.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.scopes.iter().find_map(|s| s.owner.as_deref())
    }

    /// Returns `true` if the canonical scope `name` is granted.
    #[must_use]
    pub fn has_canonical(&self, name: &str) -> bool {
        self.scopes.iter().any(|s| s.is_canonical_named(name))
    }
}

/// Tokens already serialized while handling the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuedTokens {
    /// Protected authorization code.
    pub code: Option<String>,
    /// Signed access token.
    pub access_token: Option<String>,
    /// Signed ID token.
    pub id_token: Option<String>,
    /// Protected refresh token.
    pub refresh_token: Option<String>,
}

impl IssuedTokens {
    /// Records the serialized form of a token.
    pub fn record(&mut self, kind: TokenKind, value: String) {
        let slot = match kind {
            TokenKind::AuthorizationCode => &mut self.code,
            TokenKind::AccessToken => &mut self.access_token,
            TokenKind::IdToken => &mut self.id_token,
            TokenKind::RefreshToken => &mut self.refresh_token,
        };
        *slot = Some(value);
    }

    /// Returns `true` if nothing was issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.access_token.is_none()
            && self.id_token.is_none()
            && self.refresh_token.is_none()
    }
}

/// State shared by the claim providers while one token is generated.
#[derive(Debug, Clone)]
pub struct TokenGeneratingContext {
    kind: TokenKind,
    parameters: Parameters,
    user: Identity,
    application: Identity,
    grants: RequestGrants,
    issued: IssuedTokens,
    algorithm: Option<SigningAlgorithm>,
    claims: Vec<Claim>,
    generated: bool,
}

impl TokenGeneratingContext {
    /// Creates a context for one token of `kind`.
    #[must_use]
    pub fn new(
        kind: TokenKind,
        parameters: Parameters,
        user: Identity,
        application: Identity,
        grants: RequestGrants,
    ) -> Self {
        Self {
            kind,
            parameters,
            user,
            application,
            grants,
            issued: IssuedTokens::default(),
            algorithm: None,
            claims: Vec::new(),
            generated: false,
        }
    }

    /// Makes the tokens issued earlier in the request visible to the providers.
    #[must_use]
    pub fn with_issued(mut self, issued: IssuedTokens) -> Self {
        self.issued = issued;
        self
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn user(&self) -> &Identity {
        &self.user
    }

    pub fn application(&self) -> &Identity {
        &self.application
    }

    pub fn grants(&self) -> &RequestGrants {
        &self.grants
    }

    pub fn issued(&self) -> &IssuedTokens {
        &self.issued
    }

    /// Algorithm of the key that will sign the token, for signed kinds.
    pub fn algorithm(&self) -> Option<SigningAlgorithm> {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: SigningAlgorithm) {
        self.algorithm = Some(algorithm);
    }

    /// Claims generated so far.
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn add_claim(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        self.claims.push(Claim::new(claim_type, value));
    }

    /// Removes and returns the generated claims.
    pub fn take_claims(&mut self) -> Vec<Claim> {
        std::mem::take(&mut self.claims)
    }

    /// Flags the context as processed by the claims pipeline.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the pipeline already ran.
    pub(crate) fn mark_generated(&mut self) -> AuthResult<()> {
        if self.generated {
            return Err(AuthError::internal(format!(
                "Claims for this {} were already generated",
                self.kind
            )));
        }
        self.generated = true;
        Ok(())
    }
}
