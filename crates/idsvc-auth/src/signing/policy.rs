//! Signing credential selection.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::SigningConfig;
use crate::error::AuthError;
use crate::signing::descriptor::SigningCredentialsDescriptor;
use crate::signing::sources::{
    DevelopmentCredentialsSource, SigningCredentialsSource, StaticCredentialsSource,
};
use crate::token::jwt::{Jwks, JwtPayload, JwtSigner};

/// Picks the key that signs new tokens and the keys published for verification.
///
/// Sources are consulted in registration order and asked for their
/// descriptors on every call.
#[derive(Clone, Default)]
pub struct SigningCredentialsPolicy {
    sources: Vec<Arc<dyn SigningCredentialsSource>>,
}

impl std::fmt::Debug for SigningCredentialsPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningCredentialsPolicy")
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl SigningCredentialsPolicy {
    /// Creates a policy over the given sources.
    #[must_use]
    pub fn new(sources: Vec<Arc<dyn SigningCredentialsSource>>) -> Self {
        Self { sources }
    }

    /// Builds the sources described by the configuration.
    ///
    /// Configured keys come first, then the development directory. The
    /// development key pair is generated when requested and missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured key cannot be loaded.
    pub async fn from_config(config: &SigningConfig) -> AuthResult<Self> {
        let mut sources: Vec<Arc<dyn SigningCredentialsSource>> = Vec::new();

        if !config.keys.is_empty() {
            sources.push(Arc::new(StaticCredentialsSource::load(&config.keys).await?));
        }

        if let Some(development) = &config.development {
            let algorithm = crate::config::parse_algorithm(&development.algorithm)?;
            let source = DevelopmentCredentialsSource::new(&development.directory, algorithm);
            if development.create_if_missing {
                source.ensure_credentials().await?;
            }
            sources.push(Arc::new(source));
        }

        Ok(Self { sources })
    }

    /// Appends a source with the lowest preference.
    pub fn add_source(&mut self, source: Arc<dyn SigningCredentialsSource>) {
        self.sources.push(source);
    }

    async fn all_descriptors(&self) -> AuthResult<Vec<SigningCredentialsDescriptor>> {
        let mut descriptors = Vec::new();
        for source in &self.sources {
            descriptors.extend(source.credentials().await?);
        }
        Ok(descriptors)
    }

    /// Returns the first descriptor whose window contains `now`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NoSigningCredentials`] if none is valid.
    pub async fn current_credentials(
        &self,
        now: OffsetDateTime,
    ) -> AuthResult<SigningCredentialsDescriptor> {
        let descriptor = self
            .all_descriptors()
            .await?
            .into_iter()
            .find(|d| d.is_valid_at(now));

        match descriptor {
            Some(descriptor) => Ok(descriptor),
            None => {
                tracing::warn!(now = %now, "No signing credentials are valid");
                Err(AuthError::NoSigningCredentials)
            }
        }
    }

    /// Returns every descriptor that has not expired at `now`, including keys
    /// that only become valid later.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails.
    pub async fn published_credentials(
        &self,
        now: OffsetDateTime,
    ) -> AuthResult<Vec<SigningCredentialsDescriptor>> {
        Ok(self
            .all_descriptors()
            .await?
            .into_iter()
            .filter(|d| !d.is_expired_at(now))
            .collect())
    }

    /// Returns the JSON Web Key Set of the published credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails.
    pub async fn jwks(&self, now: OffsetDateTime) -> AuthResult<Jwks> {
        Ok(self
            .published_credentials(now)
            .await?
            .iter()
            .map(SigningCredentialsDescriptor::to_jwk)
            .collect())
    }

    /// Verifies a signed token against the credentials published at `now`.
    ///
    /// `exp` and `nbf` are checked against `now`, not the system time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the token does not verify.
    pub async fn verify(
        &self,
        signer: &JwtSigner,
        token: &str,
        now: OffsetDateTime,
    ) -> AuthResult<JwtPayload> {
        let published = self.published_credentials(now).await?;
        signer
            .verify(token, published.iter().map(|d| d.key_pair()), now)
            .map_err(|e| {
                tracing::warn!(error = %e, "Rejected signed token");
                AuthError::from(e)
            })
    }
}
