//! Claims and identities.
//!
//! A [`Claim`] is a typed string assertion. Tokens and identities are both
//! ordered claim bags; a claim type may repeat unless a token kind forbids it.

use serde::{Deserialize, Serialize};

/// Claim types carried by issued tokens.
pub mod claim_types {
    /// Unique token identifier.
    pub const TOKEN_ID: &str = "jti";
    /// Issued-at time, epoch seconds.
    pub const ISSUED_AT: &str = "iat";
    /// Expiration time, epoch seconds.
    pub const EXPIRES: &str = "exp";
    /// Not-before time, epoch seconds.
    pub const NOT_BEFORE: &str = "nbf";
    /// Issuer.
    pub const ISSUER: &str = "iss";
    /// Subject.
    pub const SUBJECT: &str = "sub";
    /// Audience.
    pub const AUDIENCE: &str = "aud";
    /// Authorized party.
    pub const AUTHORIZED_PARTY: &str = "azp";
    /// Space-separated scopes.
    pub const SCOPE: &str = "scope";
    /// OpenID Connect nonce.
    pub const NONCE: &str = "nonce";
    /// Authorization code hash.
    pub const CODE_HASH: &str = "c_hash";
    /// Access token hash.
    pub const ACCESS_TOKEN_HASH: &str = "at_hash";
    /// User identifier.
    pub const USER_ID: &str = "user_id";
    /// Client identifier.
    pub const CLIENT_ID: &str = "client_id";
    /// Redirect URI of the authorization request.
    pub const REDIRECT_URI: &str = "redirect_uri";
    /// Token kind a code or refresh token entitles its bearer to redeem.
    pub const GRANTED_TOKEN: &str = "granted_token";
    /// Owning client id of the resource the grant was issued for.
    pub const RESOURCE: &str = "resource";
    /// PKCE code challenge.
    pub const CODE_CHALLENGE: &str = "code_challenge";
    /// PKCE code challenge method.
    pub const CODE_CHALLENGE_METHOD: &str = "code_challenge_method";
}

/// Claim types carried by user and application identities.
pub mod principal_claim_types {
    /// Stable identifier of the user or application.
    pub const NAME_IDENTIFIER: &str = "nameid";
    /// Display name.
    pub const NAME: &str = "name";
    /// Client identifier of an application.
    pub const CLIENT_ID: &str = "client_id";
    /// Registered post-logout redirect URI of an application.
    pub const LOGOUT_REDIRECT_URI: &str = "logout_redirect_uri";
    /// User identifier recorded on a session identity.
    pub const USER_ID: &str = "user_id";
}

/// A typed key/value assertion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type.
    #[serde(rename = "type")]
    pub claim_type: String,

    /// Claim value.
    pub value: String,
}

impl Claim {
    /// Creates a new claim.
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// An ordered set of claims describing a user, an application or a session.
///
/// An identity with no claims is *empty*; principal resolution returns an
/// empty identity for entities that no longer exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Claims in insertion order.
    pub claims: Vec<Claim>,
}

impl Identity {
    /// Creates an empty identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an identity from claims.
    #[must_use]
    pub fn from_claims(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    /// Appends a claim.
    #[must_use]
    pub fn with_claim(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.push(Claim::new(claim_type, value));
        self
    }

    /// Returns `true` if the identity carries no claims.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Returns the first value of a claim type.
    #[must_use]
    pub fn find_first(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Returns every value of a claim type.
    pub fn find_all<'a>(&'a self, claim_type: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.claims
            .iter()
            .filter(move |c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// Returns the name identifier of the identity.
    #[must_use]
    pub fn name_identifier(&self) -> Option<&str> {
        self.find_first(principal_claim_types::NAME_IDENTIFIER)
    }
}
