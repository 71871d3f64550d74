use crate::AuthResult;
use crate::claims::context::TokenGeneratingContext;
use crate::claims::manager::TokenClaimsProvider;
use crate::claims::providers::orders;
use crate::error::AuthError;
use crate::token::{TokenKind, token_hash};
use crate::types::claims::claim_types;

/// Binds an ID token to the code and access token issued alongside it
/// (`c_hash` and `at_hash`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenHashClaimsProvider;

impl TokenClaimsProvider for TokenHashClaimsProvider {
    fn order(&self) -> i32 {
        orders::TOKEN_HASH
    }

    fn on_generating_claims(&self, context: &mut TokenGeneratingContext) -> AuthResult<()> {
        if context.kind() != TokenKind::IdToken {
            return Ok(());
        }

        let issued = context.issued();
        if issued.code.is_none() && issued.access_token.is_none() {
            return Ok(());
        }

        let algorithm = context.algorithm().ok_or_else(|| {
            AuthError::internal("The signing algorithm must be known before hashing tokens")
        })?;

        let code_hash = issued.code.as_deref().map(|c| token_hash(c, algorithm));
        let access_token_hash = issued
            .access_token
            .as_deref()
            .map(|t| token_hash(t, algorithm));

        if let Some(hash) = code_hash {
            context.add_claim(claim_types::CODE_HASH, hash);
        }
        if let Some(hash) = access_token_hash {
            context.add_claim(claim_types::ACCESS_TOKEN_HASH, hash);
        }
        Ok(())
    }
}
