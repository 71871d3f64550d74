use crate::AuthResult;
use crate::claims::context::TokenGeneratingContext;
use crate::claims::manager::TokenClaimsProvider;
use crate::claims::providers::orders;
use crate::oauth::parameters::names;
use crate::token::TokenKind;
use crate::types::claims::claim_types;

/// Carries the `nonce` of the authorization request through to the tokens
/// issued for it.
///
/// On the authorization request the nonce comes from the request itself;
/// on an exchange it comes from the exchanged token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonceClaimsProvider;

impl TokenClaimsProvider for NonceClaimsProvider {
    fn order(&self) -> i32 {
        orders::NONCE
    }

    fn on_generating_claims(&self, context: &mut TokenGeneratingContext) -> AuthResult<()> {
        if !matches!(
            context.kind(),
            TokenKind::AuthorizationCode | TokenKind::AccessToken | TokenKind::IdToken
        ) {
            return Ok(());
        }

        let nonce = match context.grants().source() {
            None => context.parameters().get(names::NONCE),
            Some(source) => source.nonce(),
        }
        .filter(|n| !n.is_empty())
        .map(str::to_string);

        if let Some(nonce) = nonce {
            context.add_claim(claim_types::NONCE, nonce);
        }
        Ok(())
    }
}
