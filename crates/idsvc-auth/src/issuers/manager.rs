//! Token manager.
//!
//! Picks the issuers each flow needs and runs them in order:
//!
//! | Flow | Issued |
//! |------|--------|
//! | Authorization request | code if `response_type` has `code`, then ID token if it has `id_token` |
//! | Code exchange | access token, then ID token and refresh token if the code grants them |
//! | Refresh | same rule against the refresh token |
//! | Client credentials | access token |
//!
//! The first failure aborts the flow; no partial result is returned.

use std::sync::Arc;

use crate::AuthResult;
use crate::claims::{IssuedTokens, RequestGrants, TokenClaimsManager, TokenGeneratingContext};
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::issuers::{
    AuthorizationCodeIssuer, JwtAccessTokenIssuer, JwtIdTokenIssuer, RefreshTokenIssuer,
    TokenIssuer,
};
use crate::oauth::authorize::{AuthorizationRequest, resolve_scopes};
use crate::oauth::errors::ProtocolError;
use crate::oauth::parameters::Parameters;
use crate::oauth::token::{TokenGrant, TokenRequest, TokenResponse};
use crate::protection::{DataProtector, TokenProtector};
use crate::signing::SigningCredentialsPolicy;
use crate::storage::PrincipalResolver;
use crate::token::{JwtSigner, TokenKind};
use crate::types::{Application, Identity, principal_claim_types};

/// Runs the token issuers for the authorization and token endpoints.
#[derive(Clone)]
pub struct TokenManager {
    codes: AuthorizationCodeIssuer,
    access_tokens: JwtAccessTokenIssuer,
    id_tokens: JwtIdTokenIssuer,
    refresh_tokens: RefreshTokenIssuer,
    principals: Arc<dyn PrincipalResolver>,
    access_token_lifetime: u64,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("access_token_lifetime", &self.access_token_lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Creates a manager over explicit issuers.
    ///
    /// `access_token_lifetime` is reported as `expires_in`, in seconds.
    #[must_use]
    pub fn new(
        codes: AuthorizationCodeIssuer,
        access_tokens: JwtAccessTokenIssuer,
        id_tokens: JwtIdTokenIssuer,
        refresh_tokens: RefreshTokenIssuer,
        principals: Arc<dyn PrincipalResolver>,
        access_token_lifetime: u64,
    ) -> Self {
        Self {
            codes,
            access_tokens,
            id_tokens,
            refresh_tokens,
            principals,
            access_token_lifetime,
        }
    }

    /// Wires the built-in providers, issuers and credential sources.
    ///
    /// Without a configured protection key a random one is used, so codes and
    /// refresh tokens stop working after a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the protection key or a signing key cannot be loaded.
    pub async fn from_config(
        config: &AuthConfig,
        principals: Arc<dyn PrincipalResolver>,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        let claims = TokenClaimsManager::with_defaults(config, clock.clone());

        let protector: Arc<dyn TokenProtector> = match &config.protection.key {
            Some(key) => Arc::new(
                DataProtector::from_encoded_key(key)
                    .map_err(|e| AuthError::configuration(e.to_string()))?,
            ),
            None => {
                tracing::warn!("No protection key configured, using an ephemeral key");
                Arc::new(DataProtector::ephemeral())
            }
        };

        let policy = SigningCredentialsPolicy::from_config(&config.signing).await?;
        let signer = JwtSigner::new(config.issuer.clone());

        Ok(Self::new(
            AuthorizationCodeIssuer::new(claims.clone(), protector.clone(), clock.clone()),
            JwtAccessTokenIssuer::new(claims.clone(), policy.clone(), signer.clone(), clock.clone()),
            JwtIdTokenIssuer::new(claims.clone(), policy, signer, clock.clone()),
            RefreshTokenIssuer::new(claims, protector, clock),
            principals,
            config.tokens.access_token.not_valid_after.as_secs(),
        ))
    }

    #[must_use]
    pub fn authorization_codes(&self) -> &AuthorizationCodeIssuer {
        &self.codes
    }

    #[must_use]
    pub fn access_tokens(&self) -> &JwtAccessTokenIssuer {
        &self.access_tokens
    }

    #[must_use]
    pub fn id_tokens(&self) -> &JwtIdTokenIssuer {
        &self.id_tokens
    }

    #[must_use]
    pub fn refresh_tokens(&self) -> &RefreshTokenIssuer {
        &self.refresh_tokens
    }

    /// Issues the tokens of a validated authorization request.
    ///
    /// The code is issued before the ID token so that `c_hash` can bind it.
    /// `response_type=none` issues nothing.
    ///
    /// # Errors
    ///
    /// Returns the first issuer error.
    pub async fn authorize(
        &self,
        request: &AuthorizationRequest,
        user: &Identity,
        application: &Identity,
    ) -> AuthResult<IssuedTokens> {
        let grants = RequestGrants::new(request.scopes.clone());
        let mut issued = IssuedTokens::default();

        if request.response_type.includes_code() {
            self.run(
                &self.codes,
                &request.parameters,
                user,
                application,
                &grants,
                &mut issued,
            )
            .await?;
        }

        if request.response_type.includes_id_token() {
            self.run(
                &self.id_tokens,
                &request.parameters,
                user,
                application,
                &grants,
                &mut issued,
            )
            .await?;
        }

        Ok(issued)
    }

    /// Handles a token request for an authenticated grant type.
    ///
    /// # Errors
    ///
    /// Returns a protocol error if the client or the grant is rejected, or
    /// the first issuer error.
    pub async fn exchange(
        &self,
        request: &TokenRequest,
        application: &Application,
    ) -> AuthResult<TokenResponse> {
        let result = self.exchange_inner(request, application).await;
        if let Err(error) = &result {
            tracing::info!(
                client_id = %request.client_id,
                grant_type = %request.grant_type().as_str(),
                category = %error.category(),
                error = %error,
                "Token request rejected"
            );
        }
        result
    }

    async fn exchange_inner(
        &self,
        request: &TokenRequest,
        application: &Application,
    ) -> AuthResult<TokenResponse> {
        request.authenticate_client(application)?;

        let issued = match &request.grant {
            TokenGrant::AuthorizationCode { code, .. } => {
                let token = self.codes.read_authorization_code(code)?;
                request.validate_code(&token)?;
                self.exchange_grants(request, RequestGrants::from_token(token))
                    .await?
            }
            TokenGrant::RefreshToken { refresh_token } => {
                let grants = self.refresh_tokens.exchange_refresh_token(refresh_token)?;
                if let Some(token) = grants.source() {
                    request.validate_refresh_token(token)?;
                }
                self.exchange_grants(request, grants).await?
            }
            TokenGrant::ClientCredentials { scope } => {
                self.client_credentials(request, application, scope.as_deref().unwrap_or_default())
                    .await?
            }
        };

        tracing::debug!(
            client_id = %request.client_id,
            grant_type = %request.grant_type().as_str(),
            "Token request completed"
        );

        TokenResponse::from_issued(issued, self.access_token_lifetime)
            .ok_or_else(|| AuthError::internal("No access token was issued"))
    }

    /// Issues the access token and the tokens granted by an exchanged code or
    /// refresh token.
    async fn exchange_grants(
        &self,
        request: &TokenRequest,
        grants: RequestGrants,
    ) -> AuthResult<IssuedTokens> {
        let user_id = grants
            .user_id()
            .ok_or_else(|| AuthError::internal("Exchanged token has no user id"))?;
        let user = self.principals.user_identity(user_id).await?;
        if user.is_empty() {
            tracing::warn!(client_id = %request.client_id, "Exchanged token names an unknown user");
            return Err(ProtocolError::invalid_grant().into());
        }
        let application = self
            .principals
            .application_identity(&request.client_id)
            .await?;

        let mut issued = IssuedTokens::default();
        let parameters = &request.parameters;

        self.run(
            &self.access_tokens,
            parameters,
            &user,
            &application,
            &grants,
            &mut issued,
        )
        .await?;

        if grants.grants(TokenKind::IdToken) {
            self.run(
                &self.id_tokens,
                parameters,
                &user,
                &application,
                &grants,
                &mut issued,
            )
            .await?;
        }

        if grants.grants(TokenKind::RefreshToken) {
            self.run(
                &self.refresh_tokens,
                parameters,
                &user,
                &application,
                &grants,
                &mut issued,
            )
            .await?;
        }

        Ok(issued)
    }

    /// Issues an access token to the client itself.
    async fn client_credentials(
        &self,
        request: &TokenRequest,
        application: &Application,
        scope: &str,
    ) -> AuthResult<IssuedTokens> {
        let scopes = resolve_scopes(scope, application)?;
        let user = Identity::new()
            .with_claim(principal_claim_types::NAME_IDENTIFIER, &application.client_id)
            .with_claim(principal_claim_types::NAME, &application.name);
        let application = self
            .principals
            .application_identity(&application.client_id)
            .await?;

        let mut issued = IssuedTokens::default();
        self.run(
            &self.access_tokens,
            &request.parameters,
            &user,
            &application,
            &RequestGrants::new(scopes),
            &mut issued,
        )
        .await?;
        Ok(issued)
    }

    async fn run(
        &self,
        issuer: &dyn TokenIssuer,
        parameters: &Parameters,
        user: &Identity,
        application: &Identity,
        grants: &RequestGrants,
        issued: &mut IssuedTokens,
    ) -> AuthResult<()> {
        let kind = issuer.kind();
        let mut context = TokenGeneratingContext::new(
            kind,
            parameters.clone(),
            user.clone(),
            application.clone(),
            grants.clone(),
        )
        .with_issued(issued.clone());

        let value = issuer.issue(&mut context).await?;
        issued.record(kind, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::oauth::authorize::validate_authorization_request;
    use crate::oauth::parameters::names;
    use crate::signing::{SigningCredentialsDescriptor, StaticCredentialsSource};
    use crate::storage::{
        ApplicationStore, InMemoryApplicationStore, InMemoryUserStore, StorePrincipalResolver,
    };
    use crate::token::SigningKeyPair;
    use crate::types::{ApplicationScope, GrantType, User};

    const ISSUER: &str = "https://idp.example.com";
    const REDIRECT_URI: &str = "https://client.example.com/cb";
    const SECRET: &str = "s3cret";

    struct Fixture {
        manager: TokenManager,
        applications: Arc<InMemoryApplicationStore>,
        clock: Arc<FixedClock>,
    }

    fn registration() -> Application {
        Application {
            id: "app-1".to_string(),
            client_id: "client-1".to_string(),
            name: "Client One".to_string(),
            client_secret_hash: Some(crate::client_secret::hash_client_secret(SECRET).unwrap()),
            grant_types: vec![
                GrantType::AuthorizationCode,
                GrantType::RefreshToken,
                GrantType::ClientCredentials,
            ],
            redirect_uris: vec![REDIRECT_URI.to_string()],
            logout_redirect_uris: Vec::new(),
            scopes: vec![ApplicationScope::resource("api", "api.read")],
            claims: Vec::new(),
            concurrency_stamp: String::new(),
        }
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(FixedClock::new(time::OffsetDateTime::now_utc()));
        let applications = Arc::new(InMemoryApplicationStore::new());
        applications.create(registration()).await.unwrap();
        let users = Arc::new(InMemoryUserStore::new());
        users.insert(User::new("user-1", "alice")).await;

        let config = AuthConfig {
            issuer: ISSUER.to_string(),
            ..AuthConfig::default()
        };
        let principals = Arc::new(StorePrincipalResolver::new(applications.clone(), users));
        let mut manager = TokenManager::from_config(&config, principals, clock.clone())
            .await
            .unwrap();

        let key = Arc::new(SigningKeyPair::generate_ec("ec-1").unwrap());
        let mut policy = SigningCredentialsPolicy::default();
        policy.add_source(Arc::new(StaticCredentialsSource::new(vec![
            SigningCredentialsDescriptor::unbounded(key),
        ])));
        let claims = TokenClaimsManager::with_defaults(&config, clock.clone());
        manager.access_tokens = JwtAccessTokenIssuer::new(
            claims.clone(),
            policy.clone(),
            JwtSigner::new(ISSUER),
            clock.clone(),
        );
        manager.id_tokens =
            JwtIdTokenIssuer::new(claims, policy, JwtSigner::new(ISSUER), clock.clone());

        Fixture {
            manager,
            applications,
            clock,
        }
    }

    fn user() -> Identity {
        Identity::new()
            .with_claim(principal_claim_types::NAME_IDENTIFIER, "user-1")
            .with_claim(principal_claim_types::NAME, "alice")
    }

    async fn authorize(fixture: &Fixture, scope: &str, response_type: &str) -> IssuedTokens {
        let parameters = Parameters::new()
            .with(names::CLIENT_ID, "client-1")
            .with(names::REDIRECT_URI, REDIRECT_URI)
            .with(names::RESPONSE_TYPE, response_type)
            .with(names::SCOPE, scope)
            .with(names::NONCE, "n-1");
        let request = validate_authorization_request(parameters, fixture.applications.as_ref())
            .await
            .unwrap();
        let application = fixture
            .manager
            .principals
            .application_identity("client-1")
            .await
            .unwrap();
        fixture
            .manager
            .authorize(&request, &user(), &application)
            .await
            .unwrap()
    }

    fn code_request(code: &str) -> TokenRequest {
        TokenRequest::from_parameters(
            Parameters::new()
                .with(names::GRANT_TYPE, "authorization_code")
                .with(names::CLIENT_ID, "client-1")
                .with(names::CLIENT_SECRET, SECRET)
                .with(names::CODE, code)
                .with(names::REDIRECT_URI, REDIRECT_URI),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_code_then_id_token() {
        let fixture = fixture().await;
        let issued = authorize(&fixture, "openid api.read", "code id_token").await;

        assert!(issued.code.is_some());
        let id_token = issued.id_token.unwrap();
        let claims = fixture.manager.id_tokens().verify(&id_token).await.unwrap();
        assert!(claims.get("c_hash").is_some());
        assert_eq!(claims["nonce"], "n-1");
    }

    #[tokio::test]
    async fn test_exchange_issues_granted_tokens() {
        let fixture = fixture().await;
        let issued = authorize(&fixture, "openid offline_access api.read", "code").await;

        let response = fixture
            .manager
            .exchange(&code_request(&issued.code.unwrap()), &registration())
            .await
            .unwrap();
        assert_eq!(response.expires_in, 7200);
        assert!(response.id_token.is_some());
        let refresh_token = response.refresh_token.unwrap();

        let access = fixture
            .manager
            .access_tokens()
            .verify(&response.access_token)
            .await
            .unwrap();
        assert_eq!(access["aud"], "api");
        assert_eq!(access["scope"], "api.read");

        let refresh = TokenRequest::from_parameters(
            Parameters::new()
                .with(names::GRANT_TYPE, "refresh_token")
                .with(names::CLIENT_ID, "client-1")
                .with(names::CLIENT_SECRET, SECRET)
                .with(names::REFRESH_TOKEN, refresh_token),
        )
        .unwrap();
        let refreshed = fixture
            .manager
            .exchange(&refresh, &registration())
            .await
            .unwrap();
        assert!(refreshed.id_token.is_some());
        assert!(refreshed.refresh_token.is_some());
    }

    #[tokio::test]
    async fn test_exchange_without_refresh_grant() {
        let fixture = fixture().await;
        let issued = authorize(&fixture, "openid api.read", "code").await;

        let response = fixture
            .manager
            .exchange(&code_request(&issued.code.unwrap()), &registration())
            .await
            .unwrap();
        assert!(response.id_token.is_some());
        assert!(response.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_expired_code() {
        let fixture = fixture().await;
        let issued = authorize(&fixture, "openid", "code").await;
        fixture.clock.advance(time::Duration::minutes(10));

        let result = fixture
            .manager
            .exchange(&code_request(&issued.code.unwrap()), &registration())
            .await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_none_issues_nothing() {
        let fixture = fixture().await;
        let issued = authorize(&fixture, "openid", "none").await;
        assert!(issued.is_empty());
    }

    #[tokio::test]
    async fn test_client_credentials() {
        let fixture = fixture().await;
        let request = TokenRequest::from_parameters(
            Parameters::new()
                .with(names::GRANT_TYPE, "client_credentials")
                .with(names::CLIENT_ID, "client-1")
                .with(names::CLIENT_SECRET, SECRET)
                .with(names::SCOPE, "api.read"),
        )
        .unwrap();

        let response = fixture
            .manager
            .exchange(&request, &registration())
            .await
            .unwrap();
        assert!(response.id_token.is_none());
        assert!(response.refresh_token.is_none());

        let access = fixture
            .manager
            .access_tokens()
            .verify(&response.access_token)
            .await
            .unwrap();
        assert_eq!(access["sub"], "client-1");
        assert_eq!(access["aud"], "api");
    }

    /// Records the kind of every token that reaches the claims pipeline.
    #[derive(Default)]
    struct KindRecorder(std::sync::Mutex<Vec<TokenKind>>);

    impl KindRecorder {
        fn kinds(&self) -> Vec<TokenKind> {
            self.0.lock().unwrap().clone()
        }
    }

    impl crate::claims::TokenClaimsProvider for KindRecorder {
        fn order(&self) -> i32 {
            1_000
        }

        fn on_generating_claims(&self, context: &mut TokenGeneratingContext) -> AuthResult<()> {
            self.0.lock().unwrap().push(context.kind());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_first_issuer_failure_aborts_exchange() {
        let mut fixture = fixture().await;
        let issued = authorize(&fixture, "openid offline_access api.read", "code").await;

        let config = AuthConfig {
            issuer: ISSUER.to_string(),
            ..AuthConfig::default()
        };
        let recorder = Arc::new(KindRecorder::default());
        let claims = TokenClaimsManager::with_defaults(&config, fixture.clock.clone())
            .with_provider(recorder.clone());
        let key = Arc::new(SigningKeyPair::generate_ec("ec-1").unwrap());
        let policy = SigningCredentialsPolicy::new(vec![Arc::new(StaticCredentialsSource::new(
            vec![SigningCredentialsDescriptor::unbounded(key)],
        ))]);

        fixture.manager.access_tokens = JwtAccessTokenIssuer::new(
            claims.clone(),
            policy,
            JwtSigner::new(ISSUER),
            fixture.clock.clone(),
        );
        fixture.manager.id_tokens = JwtIdTokenIssuer::new(
            claims.clone(),
            SigningCredentialsPolicy::default(),
            JwtSigner::new(ISSUER),
            fixture.clock.clone(),
        );
        fixture.manager.refresh_tokens = RefreshTokenIssuer::new(
            claims,
            Arc::new(DataProtector::ephemeral()),
            fixture.clock.clone(),
        );

        let result = fixture
            .manager
            .exchange(&code_request(&issued.code.unwrap()), &registration())
            .await;

        assert!(matches!(result, Err(AuthError::NoSigningCredentials)));
        // The ID token fails on key selection, before its claims are built.
        assert_eq!(recorder.kinds(), vec![TokenKind::AccessToken]);
        assert!(!recorder.kinds().contains(&TokenKind::RefreshToken));
    }
}
