//! User accounts.

use serde::{Deserialize, Serialize};

use crate::types::claims::Claim;

/// A user known to the identity provider.
///
/// Credentials live with the embedding application; the engine only needs the
/// identifier, the name and the claims to place on the user identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier, used as the name identifier claim.
    pub id: String,

    /// Login name.
    pub user_name: String,

    /// Additional claims placed on the user identity.
    #[serde(default)]
    pub claims: Vec<Claim>,

    /// Optimistic concurrency stamp, replaced on every update.
    #[serde(default)]
    pub concurrency_stamp: String,
}

impl User {
    /// Creates a user with no extra claims.
    #[must_use]
    pub fn new(id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_name: user_name.into(),
            claims: Vec::new(),
            concurrency_stamp: uuid::Uuid::new_v4().to_string(),
        }
    }
}
