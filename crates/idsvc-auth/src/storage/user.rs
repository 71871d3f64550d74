//! User storage trait.

use async_trait::async_trait;

use crate::storage::StoreError;
use crate::types::{Claim, User};

/// Read access to user accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by identifier.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Find a user by login name.
    async fn find_by_name(&self, user_name: &str) -> Result<Option<User>, StoreError>;

    /// Claims placed on the user identity.
    async fn claims(&self, id: &str) -> Result<Vec<Claim>, StoreError> {
        Ok(self
            .find_by_id(id)
            .await?
            .map(|u| u.claims)
            .unwrap_or_default())
    }
}
