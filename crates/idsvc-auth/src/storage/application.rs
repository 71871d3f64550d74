//! Application storage trait.

use async_trait::async_trait;

use crate::storage::StoreError;
use crate::types::{Application, ApplicationScope, Claim};

/// Storage operations for registered client applications.
///
/// `update` and `delete` compare the concurrency stamp of the passed
/// application with the stored one and fail with
/// [`StoreError::ConcurrencyFailure`] when they differ.
#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Find an application by its store identifier.
    async fn find_by_id(&self, id: &str) -> Result<Option<Application>, StoreError>;

    /// Find an application by its protocol client id.
    async fn find_by_client_id(&self, client_id: &str)
    -> Result<Option<Application>, StoreError>;

    /// Find an application by its display name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Application>, StoreError>;

    /// Create an application.
    ///
    /// # Errors
    ///
    /// Fails if the application is invalid or the client id is taken.
    async fn create(&self, application: Application) -> Result<Application, StoreError>;

    /// Update an application; the stored concurrency stamp is replaced.
    ///
    /// # Errors
    ///
    /// Fails if the application does not exist, is invalid or is stale.
    async fn update(&self, application: Application) -> Result<Application, StoreError>;

    /// Delete an application.
    ///
    /// # Errors
    ///
    /// Fails if the application does not exist or is stale.
    async fn delete(&self, application: &Application) -> Result<(), StoreError>;

    /// Registered redirect URIs of a client.
    async fn redirect_uris(&self, client_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .find_by_client_id(client_id)
            .await?
            .map(|a| a.redirect_uris)
            .unwrap_or_default())
    }

    /// Registered post-logout redirect URIs of a client.
    async fn logout_redirect_uris(&self, client_id: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .find_by_client_id(client_id)
            .await?
            .map(|a| a.logout_redirect_uris)
            .unwrap_or_default())
    }

    /// Scopes a client may request.
    async fn scopes(&self, client_id: &str) -> Result<Vec<ApplicationScope>, StoreError> {
        Ok(self
            .find_by_client_id(client_id)
            .await?
            .map(|a| a.scopes)
            .unwrap_or_default())
    }

    /// Claims placed on the application identity.
    async fn claims(&self, client_id: &str) -> Result<Vec<Claim>, StoreError> {
        Ok(self
            .find_by_client_id(client_id)
            .await?
            .map(|a| a.claims)
            .unwrap_or_default())
    }
}
