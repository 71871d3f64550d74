//! # idsvc-auth
//!
//! OAuth 2.0 / OpenID Connect token issuance engine.
//!
//! This crate provides:
//! - Authorization and token request validation with a protocol error catalog
//! - An ordered claims pipeline that populates every token
//! - Authorization code, access token, ID token and refresh token issuers
//! - Signing credential selection and JWKS publication
//! - A login/session engine for authorization and logout decisions
//!
//! ## Overview
//!
//! A request is validated first. The session engine then decides whether the
//! caller is logged in, and the [`TokenManager`](issuers::TokenManager) runs
//! the issuers the flow needs. Each issuer builds a
//! [`TokenGeneratingContext`](claims::TokenGeneratingContext), lets the
//! [`TokenClaimsManager`](claims::TokenClaimsManager) fill it, and then
//! protects (codes, refresh tokens) or signs (access and ID tokens) the result.
//!
//! ## Modules
//!
//! - [`config`] - Issuer, token, signing, protection and session configuration
//! - [`oauth`] - Request parameters, validation and the protocol error catalog
//! - [`token`] - Token model, JWT signing and token hashes
//! - [`claims`] - Claims pipeline and built-in providers
//! - [`issuers`] - Token issuers and the token manager
//! - [`signing`] - Signing credential sources and selection policy
//! - [`protection`] - Encryption of opaque tokens
//! - [`session`] - Login/session engine
//! - [`storage`] - Storage traits and in-memory implementations
//! - [`types`] - Claims, identities, scopes, applications and users

pub mod claims;
pub mod client_secret;
pub mod clock;
pub mod config;
pub mod error;
pub mod issuers;
pub mod oauth;
pub mod protection;
pub mod session;
pub mod signing;
pub mod storage;
pub mod token;
pub mod types;

pub use claims::{
    IssuedTokens, RequestGrants, TokenClaimsManager, TokenClaimsProvider, TokenGeneratingContext,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AuthConfig, ConfigError};
pub use error::{AuthError, ErrorCategory};
pub use issuers::{
    AuthorizationCodeIssuer, JwtAccessTokenIssuer, JwtIdTokenIssuer, RefreshTokenIssuer,
    TokenIssuer, TokenManager,
};
pub use oauth::{
    AuthorizationRequest, AuthorizationResponse, Parameters, ProtocolError, TokenRequest,
    TokenResponse,
};
pub use protection::{DataProtector, ProtectionError, TokenProtector};
pub use session::{
    AuthenticationHandler, LoginContext, LoginDecision, LogoutRequest, SessionManager,
};
pub use signing::{SigningCredentialsDescriptor, SigningCredentialsPolicy};
pub use storage::{
    ApplicationStore, InMemoryApplicationStore, InMemoryUserStore, PrincipalResolver, StoreError,
    StorePrincipalResolver, UserStore,
};
pub use token::{Jwks, Token, TokenError, TokenKind};
pub use types::{Application, ApplicationScope, Claim, GrantType, Identity, User};

/// Type alias for token issuance results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```
/// use idsvc_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::claims::{TokenClaimsManager, TokenClaimsProvider, TokenGeneratingContext};
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::issuers::{TokenIssuer, TokenManager};
    pub use crate::oauth::{
        AuthorizationRequest, AuthorizationResponse, Parameters, ProtocolError, TokenRequest,
        TokenResponse, validate_authorization_request,
    };
    pub use crate::session::{AuthenticationHandler, LoginDecision, LogoutRequest, SessionManager};
    pub use crate::storage::{ApplicationStore, PrincipalResolver, UserStore};
    pub use crate::token::{Token, TokenKind};
    pub use crate::types::{Application, ApplicationScope, Claim, GrantType, Identity, User};
}
