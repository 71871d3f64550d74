//! Claims pipeline.

use std::sync::Arc;

use crate::AuthResult;
use crate::claims::context::TokenGeneratingContext;
use crate::claims::providers::{
    DefaultClaimsProvider, GrantedTokensClaimsProvider, NonceClaimsProvider, PkceClaimsProvider,
    ScopesClaimsProvider, TimestampsClaimsProvider, TokenHashClaimsProvider,
};
use crate::clock::Clock;
use crate::config::AuthConfig;

/// A contributor to the claims of a token being generated.
///
/// Providers run in ascending [`order`](TokenClaimsProvider::order); providers
/// with equal order run in registration order. A provider inspects
/// [`TokenGeneratingContext::kind`] and adds nothing for kinds it does not
/// handle.
pub trait TokenClaimsProvider: Send + Sync {
    /// Position of the provider in the pipeline.
    fn order(&self) -> i32;

    /// Adds claims to the context.
    ///
    /// # Errors
    ///
    /// Any error aborts the pipeline and is returned unchanged.
    fn on_generating_claims(&self, context: &mut TokenGeneratingContext) -> AuthResult<()>;
}

/// Runs the claim providers over a context.
#[derive(Clone)]
pub struct TokenClaimsManager {
    providers: Vec<Arc<dyn TokenClaimsProvider>>,
}

impl std::fmt::Debug for TokenClaimsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenClaimsManager")
            .field(
                "orders",
                &self.providers.iter().map(|p| p.order()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl TokenClaimsManager {
    /// Creates a manager over the given providers.
    #[must_use]
    pub fn new(mut providers: Vec<Arc<dyn TokenClaimsProvider>>) -> Self {
        // `sort_by_key` is stable.
        providers.sort_by_key(|p| p.order());
        Self { providers }
    }

    /// Creates a manager with the built-in providers.
    #[must_use]
    pub fn with_defaults(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(vec![
            Arc::new(DefaultClaimsProvider::new(
                config.issuer.clone(),
                config.tokens.clone(),
            )),
            Arc::new(TimestampsClaimsProvider::new(config.tokens.clone(), clock)),
            Arc::new(ScopesClaimsProvider),
            Arc::new(GrantedTokensClaimsProvider),
            Arc::new(NonceClaimsProvider),
            Arc::new(PkceClaimsProvider),
            Arc::new(TokenHashClaimsProvider),
        ])
    }

    /// Adds a provider, keeping the pipeline sorted.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn TokenClaimsProvider>) -> Self {
        self.providers.push(provider);
        self.providers.sort_by_key(|p| p.order());
        self
    }

    /// Runs every provider once over `context`.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the pipeline already ran for `context`,
    /// or the first provider error.
    pub fn generate(&self, context: &mut TokenGeneratingContext) -> AuthResult<()> {
        context.mark_generated()?;

        for provider in &self.providers {
            provider.on_generating_claims(context)?;
        }

        tracing::trace!(
            kind = %context.kind(),
            claims = context.claims().len(),
            "Generated token claims"
        );
        Ok(())
    }
}
