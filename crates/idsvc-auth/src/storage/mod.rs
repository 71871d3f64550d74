//! Storage contracts.
//!
//! The engine reads applications and users through these traits; the
//! persistence schema belongs to the embedding application.
//!
//! - [`ApplicationStore`] - Registered client applications
//! - [`UserStore`] - User accounts
//! - [`PrincipalResolver`] - Identities placed into the claims pipeline
//!
//! [`memory`] holds in-memory implementations for tests and development.

pub mod application;
pub mod memory;
pub mod principal;
pub mod user;

pub use application::ApplicationStore;
pub use memory::{InMemoryApplicationStore, InMemoryUserStore};
pub use principal::{PrincipalResolver, StorePrincipalResolver};
pub use user::UserStore;

use crate::error::AuthError;

/// Errors returned by the stores.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The entity does not exist.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// An entity with the same unique key exists.
    #[error("{entity} '{id}' already exists")]
    Duplicate { entity: &'static str, id: String },

    /// The entity was modified since it was read.
    #[error("{entity} '{id}' was modified concurrently")]
    ConcurrencyFailure { entity: &'static str, id: String },

    /// The entity failed validation.
    #[error("Invalid {entity}: {message}")]
    Invalid {
        entity: &'static str,
        message: String,
    },

    /// The backend failed.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn duplicate(entity: &'static str, id: impl Into<String>) -> Self {
        Self::Duplicate {
            entity,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn concurrency_failure(entity: &'static str, id: impl Into<String>) -> Self {
        Self::ConcurrencyFailure {
            entity,
            id: id.into(),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(error: StoreError) -> Self {
        AuthError::storage(error.to_string())
    }
}
