//! Full authorization code flow through the public API: session decision,
//! authorization, code exchange, refresh and logout.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use idsvc_auth::client_secret::hash_client_secret;
use idsvc_auth::oauth::{PkceChallenge, PkceVerifier, names};
use idsvc_auth::prelude::*;
use idsvc_auth::protection::DataProtector;
use idsvc_auth::signing::{SigningCredentialsDescriptor, StaticCredentialsSource};
use idsvc_auth::token::{JwtSigner, SigningKeyPair};
use idsvc_auth::{
    AuthorizationCodeIssuer, FixedClock, InMemoryApplicationStore, InMemoryUserStore,
    JwtAccessTokenIssuer, JwtIdTokenIssuer, RefreshTokenIssuer, SigningCredentialsPolicy,
    StorePrincipalResolver, TokenProtector,
};
use tokio::sync::RwLock;

const ISSUER: &str = "https://idp.example.com";
const CONFIDENTIAL: &str = "web-app";
const PUBLIC: &str = "spa";
const SECRET: &str = "correct horse battery staple";
const REDIRECT_URI: &str = "https://client.example.com/callback";
const LOGOUT_URI: &str = "https://client.example.com/signed-out";

#[derive(Default)]
struct CookieJar {
    schemes: RwLock<HashMap<String, Vec<Identity>>>,
}

#[async_trait]
impl AuthenticationHandler for CookieJar {
    async fn authenticate(&self, scheme: &str) -> AuthResult<Vec<Identity>> {
        Ok(self
            .schemes
            .read()
            .await
            .get(scheme)
            .cloned()
            .unwrap_or_default())
    }

    async fn sign_in(&self, scheme: &str, identities: Vec<Identity>) -> AuthResult<()> {
        self.schemes
            .write()
            .await
            .insert(scheme.to_string(), identities);
        Ok(())
    }

    async fn sign_out(&self, scheme: &str) -> AuthResult<()> {
        self.schemes.write().await.remove(scheme);
        Ok(())
    }
}

struct Server {
    config: AuthConfig,
    applications: Arc<InMemoryApplicationStore>,
    tokens: TokenManager,
    sessions: SessionManager,
}

fn application(client_id: &str, secret_hash: Option<String>) -> Application {
    Application {
        id: format!("{client_id}-id"),
        client_id: client_id.to_string(),
        name: client_id.to_string(),
        client_secret_hash: secret_hash,
        grant_types: vec![GrantType::AuthorizationCode, GrantType::RefreshToken],
        redirect_uris: vec![REDIRECT_URI.to_string()],
        logout_redirect_uris: vec![LOGOUT_URI.to_string()],
        scopes: vec![ApplicationScope::resource("orders-api", "orders.read")],
        claims: Vec::new(),
        concurrency_stamp: String::new(),
    }
}

async fn server() -> Server {
    let mut config = AuthConfig::from_toml_str(&format!("issuer = \"{ISSUER}\"")).unwrap();
    config.tokens.access_token.not_valid_after = std::time::Duration::from_secs(15 * 60);

    let applications = Arc::new(InMemoryApplicationStore::new());
    applications
        .create(application(
            CONFIDENTIAL,
            Some(hash_client_secret(SECRET).unwrap()),
        ))
        .await
        .unwrap();
    applications.create(application(PUBLIC, None)).await.unwrap();

    let users = Arc::new(InMemoryUserStore::new());
    let mut alice = User::new("user-42", "alice");
    alice.claims.push(Claim::new("email", "alice@example.com"));
    users.insert(alice).await;

    let principals = Arc::new(StorePrincipalResolver::new(applications.clone(), users));

    // Signed tokens are verified against the system time.
    let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(time::OffsetDateTime::now_utc()));
    let claims = TokenClaimsManager::with_defaults(&config, clock.clone());
    let protector: Arc<dyn TokenProtector> = Arc::new(DataProtector::ephemeral());
    let key = SigningKeyPair::generate_ec("orders-key").unwrap();
    let policy = SigningCredentialsPolicy::new(vec![Arc::new(StaticCredentialsSource::new(
        vec![SigningCredentialsDescriptor::unbounded(Arc::new(key))],
    ))]);

    let tokens = TokenManager::new(
        AuthorizationCodeIssuer::new(claims.clone(), protector.clone(), clock.clone()),
        JwtAccessTokenIssuer::new(
            claims.clone(),
            policy.clone(),
            JwtSigner::new(ISSUER),
            clock.clone(),
        ),
        JwtIdTokenIssuer::new(claims.clone(), policy, JwtSigner::new(ISSUER), clock.clone()),
        RefreshTokenIssuer::new(claims, protector, clock),
        principals.clone(),
        config.tokens.access_token.not_valid_after.as_secs(),
    );
    let sessions = SessionManager::new(config.session.clone(), applications.clone(), principals);

    Server {
        config,
        applications,
        tokens,
        sessions,
    }
}

async fn log_in_alice(server: &Server, jar: &CookieJar) {
    jar.sign_in(
        &server.config.session.login_scheme,
        vec![
            Identity::new()
                .with_claim(idsvc_auth::types::principal_claim_types::NAME_IDENTIFIER, "user-42")
                .with_claim(idsvc_auth::types::principal_claim_types::NAME, "alice"),
        ],
    )
    .await
    .unwrap();
}

/// Runs the authorization endpoint for a logged in caller and returns the
/// redirect response.
async fn authorize(server: &Server, jar: &CookieJar, parameters: Parameters) -> AuthorizationResponse {
    let request = validate_authorization_request(parameters, server.applications.as_ref())
        .await
        .unwrap();

    let LoginDecision::Authorized { user, application } =
        server.sessions.can_log_in(jar, &request).await.unwrap()
    else {
        panic!("caller should be authorized");
    };

    server.sessions.log_in(jar, &user, &application).await.unwrap();
    let issued = server
        .tokens
        .authorize(&request, &user, &application)
        .await
        .unwrap();
    AuthorizationResponse::success(&request, &issued)
}

fn code_parameters(client_id: &str, scope: &str) -> Parameters {
    Parameters::new()
        .with(names::CLIENT_ID, client_id)
        .with(names::REDIRECT_URI, REDIRECT_URI)
        .with(names::RESPONSE_TYPE, "code")
        .with(names::SCOPE, scope)
        .with(names::NONCE, "N-5b2f")
        .with(names::STATE, "S-af0ifjsldkj")
}

async fn exchange(server: &Server, parameters: Parameters) -> AuthResult<TokenResponse> {
    let request = TokenRequest::from_parameters(parameters)?;
    let registration = server
        .applications
        .find_by_client_id(&request.client_id)
        .await?
        .unwrap();
    server.tokens.exchange(&request, &registration).await
}

fn code_exchange(code: &str) -> Parameters {
    Parameters::new()
        .with(names::GRANT_TYPE, "authorization_code")
        .with(names::CLIENT_ID, CONFIDENTIAL)
        .with(names::CLIENT_SECRET, SECRET)
        .with(names::CODE, code)
        .with(names::REDIRECT_URI, REDIRECT_URI)
}

#[tokio::test]
async fn test_anonymous_caller_must_log_in() {
    let server = server().await;
    let jar = CookieJar::default();

    let request = validate_authorization_request(
        code_parameters(CONFIDENTIAL, "openid profile"),
        server.applications.as_ref(),
    )
    .await
    .unwrap();

    let decision = server.sessions.can_log_in(&jar, &request).await.unwrap();
    assert!(matches!(decision, LoginDecision::LoginRequired));
}

#[tokio::test]
async fn test_code_flow_issues_access_and_id_token() {
    let server = server().await;
    let jar = CookieJar::default();
    log_in_alice(&server, &jar).await;

    let response = authorize(&server, &jar, code_parameters(CONFIDENTIAL, "openid profile")).await;
    assert_eq!(response.get(names::STATE), Some("S-af0ifjsldkj"));
    assert!(response.get(names::ID_TOKEN).is_none());
    let code = response.get(names::CODE).unwrap().to_string();

    let redirect = response.to_redirect_url().unwrap();
    assert!(redirect.starts_with(REDIRECT_URI));
    assert!(redirect.contains("state=S-af0ifjsldkj"));

    let tokens = exchange(&server, code_exchange(&code)).await.unwrap();
    assert_eq!(tokens.token_type, "Bearer");
    assert_eq!(tokens.expires_in, 900);
    assert!(tokens.refresh_token.is_none());

    let id_token = server
        .tokens
        .id_tokens()
        .verify(tokens.id_token.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(id_token["iss"], ISSUER);
    assert_eq!(id_token["sub"], "user-42");
    assert_eq!(id_token["aud"], CONFIDENTIAL);
    assert_eq!(id_token["nonce"], "N-5b2f");

    // No resource scope was requested, so the client is the audience.
    let access_token = server
        .tokens
        .access_tokens()
        .verify(&tokens.access_token)
        .await
        .unwrap();
    assert_eq!(access_token["aud"], CONFIDENTIAL);
    assert_eq!(access_token["sub"], "user-42");

    let json = serde_json::to_value(&tokens).unwrap();
    assert!(json.get("refresh_token").is_none());
}

#[tokio::test]
async fn test_code_cannot_be_redeemed_by_another_client() {
    let server = server().await;
    let jar = CookieJar::default();
    log_in_alice(&server, &jar).await;

    let response = authorize(&server, &jar, code_parameters(CONFIDENTIAL, "openid")).await;
    let code = response.get(names::CODE).unwrap();

    let result = exchange(
        &server,
        Parameters::new()
            .with(names::GRANT_TYPE, "authorization_code")
            .with(names::CLIENT_ID, PUBLIC)
            .with(names::CODE, code)
            .with(names::REDIRECT_URI, REDIRECT_URI),
    )
    .await;
    assert!(matches!(result, Err(AuthError::Protocol(_))));
}

#[tokio::test]
async fn test_refresh_keeps_resource_and_scope() {
    let server = server().await;
    let jar = CookieJar::default();
    log_in_alice(&server, &jar).await;

    let response = authorize(
        &server,
        &jar,
        code_parameters(CONFIDENTIAL, "openid offline_access orders.read"),
    )
    .await;
    let tokens = exchange(&server, code_exchange(response.get(names::CODE).unwrap()))
        .await
        .unwrap();

    let mut refresh_token = tokens.refresh_token.unwrap();
    for _ in 0..2 {
        let refreshed = exchange(
            &server,
            Parameters::new()
                .with(names::GRANT_TYPE, "refresh_token")
                .with(names::CLIENT_ID, CONFIDENTIAL)
                .with(names::CLIENT_SECRET, SECRET)
                .with(names::REFRESH_TOKEN, refresh_token.clone()),
        )
        .await
        .unwrap();

        let access_token = server
            .tokens
            .access_tokens()
            .verify(&refreshed.access_token)
            .await
            .unwrap();
        assert_eq!(access_token["aud"], "orders-api");
        assert_eq!(access_token["scope"], "orders.read");
        assert!(refreshed.id_token.is_some());

        refresh_token = refreshed.refresh_token.unwrap();
    }
}

#[tokio::test]
async fn test_public_client_with_pkce() {
    let server = server().await;
    let jar = CookieJar::default();
    log_in_alice(&server, &jar).await;

    let verifier = PkceVerifier::generate();
    let challenge = PkceChallenge::from_verifier(&verifier);
    let response = authorize(
        &server,
        &jar,
        code_parameters(PUBLIC, "openid")
            .with(names::CODE_CHALLENGE, challenge.as_str())
            .with(names::CODE_CHALLENGE_METHOD, "S256"),
    )
    .await;
    let code = response.get(names::CODE).unwrap().to_string();

    let redeem = |verifier: &str| {
        Parameters::new()
            .with(names::GRANT_TYPE, "authorization_code")
            .with(names::CLIENT_ID, PUBLIC)
            .with(names::CODE, code.clone())
            .with(names::REDIRECT_URI, REDIRECT_URI)
            .with(names::CODE_VERIFIER, verifier)
    };

    let wrong = PkceVerifier::generate();
    let result = exchange(&server, redeem(wrong.as_str())).await;
    assert!(matches!(result, Err(AuthError::Protocol(_))));

    let tokens = exchange(&server, redeem(verifier.as_str())).await.unwrap();
    assert!(tokens.id_token.is_some());
}

#[tokio::test]
async fn test_logout_redirects_and_clears_sessions() {
    let server = server().await;
    let jar = CookieJar::default();
    log_in_alice(&server, &jar).await;
    authorize(&server, &jar, code_parameters(CONFIDENTIAL, "openid")).await;

    let context = server.sessions.load_context(&jar).await.unwrap();
    assert_eq!(context.sessions().len(), 1);

    let request = LogoutRequest::from_parameters(
        &Parameters::new()
            .with(names::POST_LOGOUT_REDIRECT_URI, LOGOUT_URI)
            .with(names::STATE, "bye"),
    )
    .unwrap();
    let redirect = server.sessions.log_out(&jar, &request).await.unwrap();
    assert_eq!(redirect.as_deref(), Some("https://client.example.com/signed-out?state=bye"));

    let context = server.sessions.load_context(&jar).await.unwrap();
    assert!(!context.is_authenticated());
    assert!(context.sessions().is_empty());
}
