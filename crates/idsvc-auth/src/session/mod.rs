//! Login/session engine.
//!
//! - [`context`] - The merged login and per-application session identities
//! - [`manager`] - Login decisions, session creation and logout

pub mod context;
pub mod manager;

pub use context::{LoginContext, session_identity};
pub use manager::{AuthenticationHandler, LoginDecision, LogoutRequest, SessionManager};
