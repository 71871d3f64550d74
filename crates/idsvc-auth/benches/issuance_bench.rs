//! Performance benchmarks for token issuance.
//!
//! Covers the claims pipeline on its own, opaque token protection and JWT
//! signing with each supported key family.
//!
//! Run with: `cargo bench -p idsvc-auth issuance`

use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use idsvc_auth::claims::{RequestGrants, TokenClaimsManager, TokenGeneratingContext};
use idsvc_auth::clock::{Clock, SystemClock};
use idsvc_auth::config::AuthConfig;
use idsvc_auth::issuers::{
    AuthorizationCodeIssuer, JwtAccessTokenIssuer, RefreshTokenIssuer, TokenIssuer,
};
use idsvc_auth::oauth::{Parameters, names};
use idsvc_auth::protection::{DataProtector, TokenProtector};
use idsvc_auth::signing::{
    SigningCredentialsDescriptor, SigningCredentialsPolicy, StaticCredentialsSource,
};
use idsvc_auth::token::{JwtSigner, SigningAlgorithm, SigningKeyPair, TokenKind};
use idsvc_auth::types::{ApplicationScope, Identity, principal_claim_types};
use tokio::runtime::Runtime;

const ISSUER: &str = "https://idp.example.com";

fn user() -> Identity {
    Identity::new()
        .with_claim(principal_claim_types::NAME_IDENTIFIER, "user-1")
        .with_claim(principal_claim_types::NAME, "alice")
}

fn application() -> Identity {
    Identity::new()
        .with_claim(principal_claim_types::CLIENT_ID, "client-1")
        .with_claim(principal_claim_types::NAME, "Client One")
}

fn context(kind: TokenKind) -> TokenGeneratingContext {
    TokenGeneratingContext::new(
        kind,
        Parameters::new().with(names::NONCE, "n-0S6_WzA2Mj"),
        user(),
        application(),
        RequestGrants::new(vec![
            ApplicationScope::openid(),
            ApplicationScope::offline_access(),
            ApplicationScope::resource("api", "api.read"),
        ]),
    )
}

fn claims() -> (TokenClaimsManager, Arc<dyn Clock>) {
    let config = AuthConfig {
        issuer: ISSUER.to_string(),
        ..AuthConfig::default()
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    (TokenClaimsManager::with_defaults(&config, clock.clone()), clock)
}

fn access_token_issuer(key: SigningKeyPair) -> JwtAccessTokenIssuer {
    let (claims, clock) = claims();
    let policy = SigningCredentialsPolicy::new(vec![Arc::new(StaticCredentialsSource::new(
        vec![SigningCredentialsDescriptor::unbounded(Arc::new(key))],
    ))]);
    JwtAccessTokenIssuer::new(claims, policy, JwtSigner::new(ISSUER), clock)
}

fn bench_claims_pipeline(c: &mut Criterion) {
    let (claims, _) = claims();

    c.bench_function("claims_access_token", |b| {
        b.iter(|| {
            let mut context = context(TokenKind::AccessToken);
            claims.generate(&mut context).unwrap();
            black_box(context)
        })
    });
}

fn bench_authorization_code(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (claims, clock) = claims();
    let protector: Arc<dyn TokenProtector> = Arc::new(DataProtector::ephemeral());
    let issuer = AuthorizationCodeIssuer::new(claims, protector, clock);

    c.bench_function("issue_authorization_code", |b| {
        b.to_async(&rt).iter(|| async {
            let mut context = context(TokenKind::AuthorizationCode);
            black_box(issuer.issue(&mut context).await.unwrap())
        })
    });
}

fn bench_refresh_round(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (claims, clock) = claims();
    let protector: Arc<dyn TokenProtector> = Arc::new(DataProtector::ephemeral());
    let issuer = RefreshTokenIssuer::new(claims, protector, clock);
    let refresh_token = rt
        .block_on(issuer.issue(&mut context(TokenKind::RefreshToken)))
        .unwrap();

    c.bench_function("exchange_refresh_token", |b| {
        b.iter(|| black_box(issuer.exchange_refresh_token(&refresh_token).unwrap()))
    });
}

fn bench_sign_access_token_ec(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let issuer = access_token_issuer(SigningKeyPair::generate_ec("ec-1").unwrap());

    c.bench_function("sign_access_token_es384", |b| {
        b.to_async(&rt).iter(|| async {
            let mut context = context(TokenKind::AccessToken);
            black_box(issuer.issue(&mut context).await.unwrap())
        })
    });
}

fn bench_sign_access_token_rsa(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let key = SigningKeyPair::generate_rsa("rsa-1", SigningAlgorithm::RS256).unwrap();
    let issuer = access_token_issuer(key);

    c.bench_function("sign_access_token_rs256", |b| {
        b.to_async(&rt).iter(|| async {
            let mut context = context(TokenKind::AccessToken);
            black_box(issuer.issue(&mut context).await.unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_claims_pipeline,
    bench_authorization_code,
    bench_refresh_round,
    bench_sign_access_token_ec,
    bench_sign_access_token_rsa,
);

criterion_main!(benches);
