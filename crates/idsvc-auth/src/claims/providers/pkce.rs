use crate::AuthResult;
use crate::claims::context::TokenGeneratingContext;
use crate::claims::manager::TokenClaimsProvider;
use crate::claims::providers::orders;
use crate::oauth::parameters::names;
use crate::token::TokenKind;
use crate::types::claims::claim_types;

/// Records the PKCE challenge of the authorization request on the code.
#[derive(Debug, Clone, Copy, Default)]
pub struct PkceClaimsProvider;

impl TokenClaimsProvider for PkceClaimsProvider {
    fn order(&self) -> i32 {
        orders::PKCE
    }

    fn on_generating_claims(&self, context: &mut TokenGeneratingContext) -> AuthResult<()> {
        if context.kind() != TokenKind::AuthorizationCode || !context.grants().is_initial() {
            return Ok(());
        }

        let challenge = context
            .parameters()
            .get(names::CODE_CHALLENGE)
            .map(str::to_string);
        let method = context
            .parameters()
            .get(names::CODE_CHALLENGE_METHOD)
            .map(str::to_string);

        if let Some(challenge) = challenge {
            context.add_claim(claim_types::CODE_CHALLENGE, challenge);
            if let Some(method) = method {
                context.add_claim(claim_types::CODE_CHALLENGE_METHOD, method);
            }
        }
        Ok(())
    }
}
