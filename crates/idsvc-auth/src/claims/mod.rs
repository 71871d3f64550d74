//! Claim generation.
//!
//! Every token is populated by the same ordered pipeline: a
//! [`TokenGeneratingContext`] is created for one token kind, the
//! [`TokenClaimsManager`] runs each [`TokenClaimsProvider`] over it once, and
//! the issuer turns the finished claim set into a [`Token`](crate::token::Token).

pub mod context;
pub mod manager;
pub mod providers;

pub use context::{IssuedTokens, RequestGrants, TokenGeneratingContext};
pub use manager::{TokenClaimsManager, TokenClaimsProvider};
