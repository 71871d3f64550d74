use crate::AuthResult;
use crate::claims::context::TokenGeneratingContext;
use crate::claims::manager::TokenClaimsProvider;
use crate::claims::providers::orders;
use crate::token::TokenKind;
use crate::types::claims::claim_types;
use crate::types::scope::{ApplicationScope, OFFLINE_ACCESS, OPENID};

/// Token kinds an authorization code for `scopes` entitles its holder to.
#[must_use]
pub fn grantable_tokens(scopes: &[ApplicationScope]) -> Vec<TokenKind> {
    let mut tokens = Vec::new();
    if scopes.iter().any(ApplicationScope::is_resource_scoped) {
        tokens.push(TokenKind::AccessToken);
    }
    if scopes.iter().any(|s| s.is_canonical_named(OPENID)) {
        tokens.push(TokenKind::IdToken);
    }
    if scopes.iter().any(|s| s.is_canonical_named(OFFLINE_ACCESS)) {
        tokens.push(TokenKind::RefreshToken);
    }
    tokens
}

/// Records which tokens an authorization code or refresh token may be
/// exchanged for.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantedTokensClaimsProvider;

impl TokenClaimsProvider for GrantedTokensClaimsProvider {
    fn order(&self) -> i32 {
        orders::GRANTED_TOKENS
    }

    fn on_generating_claims(&self, context: &mut TokenGeneratingContext) -> AuthResult<()> {
        let tokens = match context.kind() {
            TokenKind::AuthorizationCode => grantable_tokens(context.grants().scopes()),
            TokenKind::RefreshToken => match context.grants().source() {
                Some(_) => context.grants().tokens().to_vec(),
                None => grantable_tokens(context.grants().scopes()),
            },
            TokenKind::AccessToken | TokenKind::IdToken => return Ok(()),
        };

        for kind in tokens {
            context.add_claim(claim_types::GRANTED_TOKEN, kind.as_str());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::context::RequestGrants;
    use crate::claims::providers::test_support::{context, values};
    use crate::token::Token;
    use crate::types::claims::Claim;

    #[test]
    fn test_all_tokens_granted() {
        let grants = RequestGrants::new(vec![
            ApplicationScope::openid(),
            ApplicationScope::offline_access(),
            ApplicationScope::resource("clientA", "api1.read"),
        ]);
        let mut ctx = context(TokenKind::AuthorizationCode, grants);
        GrantedTokensClaimsProvider
            .on_generating_claims(&mut ctx)
            .unwrap();

        assert_eq!(
            values(&ctx, claim_types::GRANTED_TOKEN),
            vec!["access_token", "id_token", "refresh_token"]
        );
    }

    #[test]
    fn test_resource_only() {
        let grants = RequestGrants::new(vec![ApplicationScope::resource("clientA", "api1.read")]);
        let mut ctx = context(TokenKind::AuthorizationCode, grants);
        GrantedTokensClaimsProvider
            .on_generating_claims(&mut ctx)
            .unwrap();

        assert_eq!(values(&ctx, claim_types::GRANTED_TOKEN), vec!["access_token"]);
    }

    #[test]
    fn test_refresh_token_copies_grant() {
        let code = Token::new(
            TokenKind::AuthorizationCode,
            vec![
                Claim::new(claim_types::TOKEN_ID, "t"),
                Claim::new(claim_types::NOT_BEFORE, "0"),
                Claim::new(claim_types::ISSUED_AT, "0"),
                Claim::new(claim_types::EXPIRES, "10"),
                Claim::new(claim_types::USER_ID, "user-1"),
                Claim::new(claim_types::CLIENT_ID, "client-1"),
                Claim::new(claim_types::SCOPE, "openid offline_access"),
                Claim::new(claim_types::GRANTED_TOKEN, "id_token"),
                Claim::new(claim_types::GRANTED_TOKEN, "refresh_token"),
            ],
        )
        .unwrap();

        let mut ctx = context(TokenKind::RefreshToken, RequestGrants::from_token(code));
        GrantedTokensClaimsProvider
            .on_generating_claims(&mut ctx)
            .unwrap();

        assert_eq!(
            values(&ctx, claim_types::GRANTED_TOKEN),
            vec!["id_token", "refresh_token"]
        );
    }

    #[test]
    fn test_signed_tokens_untouched() {
        let grants = RequestGrants::new(vec![ApplicationScope::openid()]);
        for kind in [TokenKind::AccessToken, TokenKind::IdToken] {
            let mut ctx = context(kind, grants.clone());
            GrantedTokensClaimsProvider
                .on_generating_claims(&mut ctx)
                .unwrap();
            assert!(ctx.claims().is_empty());
        }
    }
}
