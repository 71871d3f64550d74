//! Domain types shared across the crate.

pub mod application;
pub mod claims;
pub mod scope;
pub mod user;

pub use application::{Application, ApplicationValidationError, GrantType};
pub use claims::{Claim, Identity, claim_types, principal_claim_types};
pub use scope::ApplicationScope;
pub use user::User;
