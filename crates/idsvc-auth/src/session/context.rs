//! Login context.
//!
//! The caller's authentication state is kept under two schemes: a login
//! scheme holding the ambient user identity, and a session scheme holding one
//! session identity per application the user has logged in to. A session
//! identity records the user id, the client id and every logout redirect URI
//! registered for the client.

use crate::types::{Identity, principal_claim_types};

/// The merged authentication state of one caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginContext {
    login: Option<Identity>,
    sessions: Vec<Identity>,
}

impl LoginContext {
    /// Merges the identities read from the login and session schemes.
    ///
    /// The first non-empty login identity wins. Session identities of any
    /// other user are dropped, and without a login identity every session
    /// identity is dropped.
    #[must_use]
    pub fn merge(login: Vec<Identity>, sessions: Vec<Identity>) -> Self {
        let login = login.into_iter().find(|identity| !identity.is_empty());
        let sessions = diff(login.as_ref(), sessions);
        Self { login, sessions }
    }

    /// The ambient login identity, if the caller is authenticated.
    #[must_use]
    pub fn login(&self) -> Option<&Identity> {
        self.login.as_ref()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.login.is_some()
    }

    /// Name identifier of the logged in user.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.login.as_ref().and_then(Identity::name_identifier)
    }

    /// Session identities, one per application.
    #[must_use]
    pub fn sessions(&self) -> &[Identity] {
        &self.sessions
    }

    /// The session identity for a user and a client.
    #[must_use]
    pub fn find_session(&self, user_id: &str, client_id: &str) -> Option<&Identity> {
        self.sessions.iter().find(|session| {
            session.find_first(principal_claim_types::USER_ID) == Some(user_id)
                && session.find_first(principal_claim_types::CLIENT_ID) == Some(client_id)
        })
    }

    /// The session identity that registered a logout redirect URI.
    #[must_use]
    pub fn find_by_logout_uri(&self, logout_uri: &str) -> Option<&Identity> {
        self.sessions.iter().find(|session| {
            session
                .find_all(principal_claim_types::LOGOUT_REDIRECT_URI)
                .any(|uri| uri == logout_uri)
        })
    }

    /// Appends a session identity.
    pub fn add_session(&mut self, session: Identity) {
        self.sessions.push(session);
    }
}

/// Builds the session identity of a user logged in to an application.
#[must_use]
pub fn session_identity(user_id: &str, client_id: &str, logout_uris: &[String]) -> Identity {
    let identity = Identity::new()
        .with_claim(principal_claim_types::USER_ID, user_id)
        .with_claim(principal_claim_types::CLIENT_ID, client_id);

    logout_uris.iter().fold(identity, |identity, uri| {
        identity.with_claim(principal_claim_types::LOGOUT_REDIRECT_URI, uri)
    })
}

fn diff(login: Option<&Identity>, sessions: Vec<Identity>) -> Vec<Identity> {
    let Some(user_id) = login.and_then(Identity::name_identifier) else {
        return Vec::new();
    };

    sessions
        .into_iter()
        .filter(|session| session.find_first(principal_claim_types::USER_ID) == Some(user_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(user_id: &str) -> Identity {
        Identity::new().with_claim(principal_claim_types::NAME_IDENTIFIER, user_id)
    }

    #[test]
    fn test_merge_drops_other_users() {
        let context = LoginContext::merge(
            vec![login("user-1")],
            vec![
                session_identity("user-1", "client-1", &["https://a/out".to_string()]),
                session_identity("user-2", "client-1", &[]),
            ],
        );

        assert!(context.is_authenticated());
        assert_eq!(context.user_id(), Some("user-1"));
        assert_eq!(context.sessions().len(), 1);
        assert!(context.find_session("user-1", "client-1").is_some());
        assert!(context.find_session("user-2", "client-1").is_none());
    }

    #[test]
    fn test_merge_without_login() {
        let context = LoginContext::merge(
            vec![Identity::new()],
            vec![session_identity("user-1", "client-1", &[])],
        );

        assert!(!context.is_authenticated());
        assert!(context.sessions().is_empty());
    }

    #[test]
    fn test_find_by_logout_uri() {
        let context = LoginContext::merge(
            vec![login("user-1")],
            vec![
                session_identity("user-1", "client-1", &["https://a/out".to_string()]),
                session_identity(
                    "user-1",
                    "client-2",
                    &["https://b/out".to_string(), "https://b/bye".to_string()],
                ),
            ],
        );

        let session = context.find_by_logout_uri("https://b/bye").unwrap();
        assert_eq!(
            session.find_first(principal_claim_types::CLIENT_ID),
            Some("client-2")
        );
        assert!(context.find_by_logout_uri("https://c/out").is_none());
    }
}
