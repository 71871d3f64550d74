//! Built-in claim providers.
//!
//! | Provider | Order | Adds |
//! |----------|-------|------|
//! | [`DefaultClaimsProvider`] | 100 | `jti`, mapped identity claims, `iss` |
//! | [`TimestampsClaimsProvider`] | 200 | `nbf`, `iat`, `exp` |
//! | [`ScopesClaimsProvider`] | 300 | `scope`, `resource`, `aud`, `azp` |
//! | [`GrantedTokensClaimsProvider`] | 400 | `granted_token` |
//! | [`NonceClaimsProvider`] | 500 | `nonce` |
//! | [`PkceClaimsProvider`] | 600 | `code_challenge`, `code_challenge_method` |
//! | [`TokenHashClaimsProvider`] | 700 | `c_hash`, `at_hash` |

mod default;
mod granted_tokens;
mod nonce;
mod pkce;
mod scopes;
mod timestamps;
mod token_hash;

pub use default::DefaultClaimsProvider;
pub use granted_tokens::{GrantedTokensClaimsProvider, grantable_tokens};
pub use nonce::NonceClaimsProvider;
pub use pkce::PkceClaimsProvider;
pub use scopes::ScopesClaimsProvider;
pub use timestamps::TimestampsClaimsProvider;
pub use token_hash::TokenHashClaimsProvider;

/// Pipeline positions of the built-in providers.
pub mod orders {
    pub const DEFAULT: i32 = 100;
    pub const TIMESTAMPS: i32 = 200;
    pub const SCOPES: i32 = 300;
    pub const GRANTED_TOKENS: i32 = 400;
    pub const NONCE: i32 = 500;
    pub const PKCE: i32 = 600;
    pub const TOKEN_HASH: i32 = 700;
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::claims::context::{RequestGrants, TokenGeneratingContext};
    use crate::oauth::parameters::Parameters;
    use crate::token::TokenKind;
    use crate::types::claims::{Identity, principal_claim_types};

    pub fn user() -> Identity {
        Identity::new()
            .with_claim(principal_claim_types::NAME_IDENTIFIER, "user-1")
            .with_claim(principal_claim_types::NAME, "alice")
    }

    pub fn application() -> Identity {
        Identity::new()
            .with_claim(principal_claim_types::CLIENT_ID, "client-1")
            .with_claim(principal_claim_types::NAME, "Client One")
    }

    pub fn context(kind: TokenKind, grants: RequestGrants) -> TokenGeneratingContext {
        TokenGeneratingContext::new(kind, Parameters::new(), user(), application(), grants)
    }

    pub fn values<'a>(context: &'a TokenGeneratingContext, claim_type: &str) -> Vec<&'a str> {
        context
            .claims()
            .iter()
            .filter(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
            .collect()
    }
}
