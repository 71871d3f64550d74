use crate::AuthResult;
use crate::claims::context::TokenGeneratingContext;
use crate::claims::manager::TokenClaimsProvider;
use crate::claims::providers::orders;
use crate::token::TokenKind;
use crate::types::claims::{claim_types, principal_claim_types};
use crate::types::scope::join_scopes;

/// Adds the granted scopes and the resource they belong to.
///
/// An access token is audienced to the resource owning its scopes and names
/// the requesting client as authorized party. Without a resource-scoped scope
/// the access token is audienced to the client itself and carries every
/// granted scope, which is what a userinfo call needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopesClaimsProvider;

impl TokenClaimsProvider for ScopesClaimsProvider {
    fn order(&self) -> i32 {
        orders::SCOPES
    }

    fn on_generating_claims(&self, context: &mut TokenGeneratingContext) -> AuthResult<()> {
        let grants = context.grants();
        let resource = grants.resource().map(str::to_string);
        let all_scopes = join_scopes(grants.scopes());

        match context.kind() {
            TokenKind::AccessToken => {
                let client_id = context
                    .application()
                    .find_first(principal_claim_types::CLIENT_ID)
                    .map(str::to_string);

                let (audience, scope) = match &resource {
                    Some(resource) => (
                        Some(resource.clone()),
                        join_scopes(grants.scopes().iter().filter(|s| s.is_resource_scoped())),
                    ),
                    None => (client_id.clone(), all_scopes),
                };

                context.add_claim(claim_types::SCOPE, scope);
                if let Some(audience) = audience {
                    context.add_claim(claim_types::AUDIENCE, audience);
                }
                if let Some(client_id) = client_id {
                    context.add_claim(claim_types::AUTHORIZED_PARTY, client_id);
                }
            }
            TokenKind::AuthorizationCode => {
                context.add_claim(claim_types::SCOPE, all_scopes);
                if let Some(resource) = resource {
                    context.add_claim(claim_types::RESOURCE, resource);
                }
            }
            TokenKind::RefreshToken => {
                let (scope, resource) = match grants.source() {
                    Some(source) => (
                        source.find_first(claim_types::SCOPE).map(str::to_string),
                        source.resource().map(str::to_string),
                    ),
                    None => (Some(all_scopes), resource),
                };

                if let Some(scope) = scope {
                    context.add_claim(claim_types::SCOPE, scope);
                }
                if let Some(resource) = resource {
                    context.add_claim(claim_types::RESOURCE, resource);
                }
            }
            TokenKind::IdToken => {}
        }

        Ok(())
    }
}
