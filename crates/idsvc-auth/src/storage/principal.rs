//! Identity resolution.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::storage::{ApplicationStore, UserStore};
use crate::types::{Identity, principal_claim_types};

/// Builds the user and application identities the claim providers read.
///
/// An unknown user or client resolves to an empty identity.
#[async_trait]
pub trait PrincipalResolver: Send + Sync {
    /// Identity of the user with the given id.
    async fn user_identity(&self, user_id: &str) -> AuthResult<Identity>;

    /// Identity of the application with the given client id.
    async fn application_identity(&self, client_id: &str) -> AuthResult<Identity>;
}

/// Resolves identities from an [`ApplicationStore`] and a [`UserStore`].
#[derive(Clone)]
pub struct StorePrincipalResolver {
    applications: Arc<dyn ApplicationStore>,
    users: Arc<dyn UserStore>,
}

impl StorePrincipalResolver {
    #[must_use]
    pub fn new(applications: Arc<dyn ApplicationStore>, users: Arc<dyn UserStore>) -> Self {
        Self {
            applications,
            users,
        }
    }
}

#[async_trait]
impl PrincipalResolver for StorePrincipalResolver {
    async fn user_identity(&self, user_id: &str) -> AuthResult<Identity> {
        let Some(user) = self.users.find_by_id(user_id).await? else {
            return Ok(Identity::new());
        };

        let mut identity = Identity::new()
            .with_claim(principal_claim_types::NAME_IDENTIFIER, user.id)
            .with_claim(principal_claim_types::NAME, user.user_name);
        identity.claims.extend(user.claims);
        Ok(identity)
    }

    async fn application_identity(&self, client_id: &str) -> AuthResult<Identity> {
        let Some(application) = self.applications.find_by_client_id(client_id).await? else {
            return Ok(Identity::new());
        };

        let mut identity = Identity::new()
            .with_claim(principal_claim_types::CLIENT_ID, application.client_id)
            .with_claim(principal_claim_types::NAME, application.name);
        identity.claims.extend(application.claims);
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::{InMemoryApplicationStore, InMemoryUserStore};
    use crate::types::{Application, Claim, GrantType, User};

    #[tokio::test]
    async fn test_resolves_identities() {
        let users = Arc::new(InMemoryUserStore::new());
        let mut user = User::new("user-1", "alice");
        user.claims.push(Claim::new("email", "alice@example.com"));
        users.insert(user).await;

        let applications = Arc::new(InMemoryApplicationStore::new());
        applications
            .create(Application {
                id: "app-1".to_string(),
                client_id: "client-1".to_string(),
                name: "Client One".to_string(),
                client_secret_hash: None,
                grant_types: vec![GrantType::AuthorizationCode],
                redirect_uris: vec!["https://client.example.com/cb".to_string()],
                logout_redirect_uris: Vec::new(),
                scopes: Vec::new(),
                claims: vec![Claim::new("tier", "gold")],
                concurrency_stamp: String::new(),
            })
            .await
            .unwrap();

        let resolver = StorePrincipalResolver::new(applications, users);

        let user = resolver.user_identity("user-1").await.unwrap();
        assert_eq!(user.name_identifier(), Some("user-1"));
        assert_eq!(user.find_first("email"), Some("alice@example.com"));

        let application = resolver.application_identity("client-1").await.unwrap();
        assert_eq!(
            application.find_first(principal_claim_types::CLIENT_ID),
            Some("client-1")
        );
        assert_eq!(application.find_first("tier"), Some("gold"));

        assert!(resolver.user_identity("missing").await.unwrap().is_empty());
        assert!(
            resolver
                .application_identity("missing")
                .await
                .unwrap()
                .is_empty()
        );
    }
}
