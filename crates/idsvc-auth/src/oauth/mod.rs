//! OAuth 2.0 / OpenID Connect request handling.
//!
//! - [`parameters`] - Ordered request/response parameter collections
//! - [`errors`] - The protocol error catalog
//! - [`authorize`] - Authorization endpoint validation and responses
//! - [`token`] - Token endpoint validation and responses
//! - [`pkce`] - PKCE challenge/verifier implementation
//!
//! # Example
//!
//! ```
//! use idsvc_auth::oauth::{Parameters, ProtocolError, names};
//!
//! let parameters = Parameters::from_form("scope=openid&scope=profile");
//! assert_eq!(
//!     parameters.single(names::SCOPE).unwrap_err(),
//!     ProtocolError::too_many_parameters(names::SCOPE)
//! );
//! ```

pub mod authorize;
pub mod errors;
pub mod parameters;
pub mod pkce;
pub mod token;

// Authorization endpoint types
pub use authorize::{
    AuthorizationRequest, AuthorizationResponse, Prompt, ResponseMode, ResponseType,
    resolve_scopes, validate_authorization_request,
};

pub use errors::ProtocolError;
pub use parameters::{Parameters, names};

// PKCE
pub use pkce::{PkceChallenge, PkceChallengeMethod, PkceError, PkceVerifier};

// Token endpoint types
pub use token::{TokenGrant, TokenRequest, TokenResponse};
