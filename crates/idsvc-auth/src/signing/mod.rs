//! Signing credentials.
//!
//! - [`descriptor`] - A key pair and its validity window
//! - [`sources`] - Static and development credential sources
//! - [`policy`] - Current-key selection, key-set publication and verification

pub mod descriptor;
pub mod policy;
pub mod sources;

pub use descriptor::SigningCredentialsDescriptor;
pub use policy::SigningCredentialsPolicy;
pub use sources::{
    DEVELOPMENT_SUBJECT, DevelopmentCredentialsSource, SigningCredentialsSource,
    StaticCredentialsSource,
};
