//! Application scopes.
//!
//! A scope is either *canonical* (one of the OpenID Connect scopes, owned by no
//! application) or *resource-scoped* (owned by the application that exposes the
//! protected resource).

use std::fmt;

use serde::{Deserialize, Serialize};

/// The `openid` scope.
pub const OPENID: &str = "openid";
/// The `profile` scope.
pub const PROFILE: &str = "profile";
/// The `email` scope.
pub const EMAIL: &str = "email";
/// The `offline_access` scope.
pub const OFFLINE_ACCESS: &str = "offline_access";

/// Names of the canonical scopes.
pub const CANONICAL_SCOPES: [&str; 4] = [OPENID, PROFILE, EMAIL, OFFLINE_ACCESS];

/// A scope together with the client id of the application that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationScope {
    /// Scope value as it appears in the `scope` parameter.
    pub name: String,

    /// Client id of the owning application; `None` for canonical scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl ApplicationScope {
    /// Returns the canonical scope with this name, if it is one.
    #[must_use]
    pub fn canonical(name: &str) -> Option<Self> {
        CANONICAL_SCOPES.contains(&name).then(|| Self {
            name: name.to_string(),
            owner: None,
        })
    }

    /// Creates a resource-scoped scope owned by `owner`.
    #[must_use]
    pub fn resource(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            owner: Some(owner.into()),
        }
    }

    /// The `openid` scope.
    #[must_use]
    pub fn openid() -> Self {
        Self {
            name: OPENID.to_string(),
            owner: None,
        }
    }

    /// The `offline_access` scope.
    #[must_use]
    pub fn offline_access() -> Self {
        Self {
            name: OFFLINE_ACCESS.to_string(),
            owner: None,
        }
    }

    /// Returns `true` for scopes owned by no application.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.owner.is_none()
    }

    /// Returns `true` if this is the canonical scope named `name`.
    #[must_use]
    pub fn is_canonical_named(&self, name: &str) -> bool {
        self.is_canonical() && self.name == name
    }

    /// Returns `true` for scopes owned by an application.
    #[must_use]
    pub fn is_resource_scoped(&self) -> bool {
        self.owner.is_some()
    }
}

impl fmt::Display for ApplicationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}@{}", self.name, owner),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Joins scope names with single spaces.
#[must_use]
pub fn join_scopes<'a>(scopes: impl IntoIterator<Item = &'a ApplicationScope>) -> String {
    scopes
        .into_iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
