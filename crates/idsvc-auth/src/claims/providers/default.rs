use crate::AuthResult;
use crate::claims::context::TokenGeneratingContext;
use crate::claims::manager::TokenClaimsProvider;
use crate::claims::providers::orders;
use crate::config::TokenOptions;
use crate::oauth::parameters::names;
use crate::token::TokenKind;
use crate::types::claims::{Identity, claim_types};

/// Adds the token id, the identity claims mapped for the token kind and the
/// issuer.
///
/// An authorization code issued on the initial request also records the
/// request's `redirect_uri`, which the exchange must repeat.
#[derive(Debug, Clone)]
pub struct DefaultClaimsProvider {
    issuer: String,
    options: TokenOptions,
}

impl DefaultClaimsProvider {
    #[must_use]
    pub fn new(issuer: impl Into<String>, options: TokenOptions) -> Self {
        Self {
            issuer: issuer.into(),
            options,
        }
    }

    fn stamps_issuer(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::AccessToken | TokenKind::IdToken => true,
            TokenKind::RefreshToken => self.options.refresh_token_issuer,
            TokenKind::AuthorizationCode => false,
        }
    }
}

fn mapped_claims<'a>(
    identity: &'a Identity,
    mappings: &'a [crate::config::ClaimMapping],
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    mappings.iter().flat_map(move |mapping| {
        identity
            .find_all(&mapping.from)
            .map(move |value| (mapping.to.as_str(), value))
    })
}

impl TokenClaimsProvider for DefaultClaimsProvider {
    fn order(&self) -> i32 {
        orders::DEFAULT
    }

    fn on_generating_claims(&self, context: &mut TokenGeneratingContext) -> AuthResult<()> {
        let kind = context.kind();
        let mapping = self.options.mapping(kind);

        context.add_claim(claim_types::TOKEN_ID, uuid::Uuid::new_v4().to_string());

        let mapped: Vec<(String, String)> = mapped_claims(context.user(), &mapping.user_claims)
            .chain(mapped_claims(
                context.application(),
                &mapping.application_claims,
            ))
            .map(|(claim_type, value)| (claim_type.to_string(), value.to_string()))
            .collect();
        for (claim_type, value) in mapped {
            context.add_claim(claim_type, value);
        }

        if self.stamps_issuer(kind) {
            context.add_claim(claim_types::ISSUER, self.issuer.clone());
        }

        if kind == TokenKind::AuthorizationCode && context.grants().is_initial() {
            if let Some(redirect_uri) = context
                .parameters()
                .get(names::REDIRECT_URI)
                .map(str::to_string)
            {
                context.add_claim(claim_types::REDIRECT_URI, redirect_uri);
            }
        }

        Ok(())
    }
}
