//! Login and logout decisions.

use std::sync::Arc;

use async_trait::async_trait;

use crate::AuthResult;
use crate::config::SessionConfig;
use crate::oauth::authorize::{AuthorizationRequest, AuthorizationResponse};
use crate::oauth::errors::ProtocolError;
use crate::oauth::parameters::{Parameters, names};
use crate::session::context::{LoginContext, session_identity};
use crate::storage::{ApplicationStore, PrincipalResolver};
use crate::types::{Identity, principal_claim_types};

/// Access to the caller's authentication state, by scheme name.
///
/// One handler serves one request; it typically wraps the request's cookies.
#[async_trait]
pub trait AuthenticationHandler: Send + Sync {
    /// Identities currently signed in under `scheme`.
    async fn authenticate(&self, scheme: &str) -> AuthResult<Vec<Identity>>;

    /// Replaces the identities signed in under `scheme`.
    async fn sign_in(&self, scheme: &str, identities: Vec<Identity>) -> AuthResult<()>;

    /// Removes every identity signed in under `scheme`.
    async fn sign_out(&self, scheme: &str) -> AuthResult<()>;
}

/// Outcome of [`SessionManager::can_log_in`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginDecision {
    /// The user must authenticate interactively.
    LoginRequired,

    /// The request cannot proceed; the response goes back to the client.
    Forbidden(AuthorizationResponse),

    /// The user is logged in.
    Authorized {
        user: Identity,
        application: Identity,
    },
}

/// A parsed end-session request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogoutRequest {
    pub post_logout_redirect_uri: Option<String>,
    pub state: Option<String>,
}

impl LogoutRequest {
    /// Parses an end-session request.
    ///
    /// # Errors
    ///
    /// Returns a catalog error for repeated parameters.
    pub fn from_parameters(parameters: &Parameters) -> Result<Self, ProtocolError> {
        Ok(Self {
            post_logout_redirect_uri: parameters
                .single(names::POST_LOGOUT_REDIRECT_URI)?
                .map(str::to_string),
            state: parameters.single(names::STATE)?.map(str::to_string),
        })
    }
}

/// Decides whether an authorization request can proceed and maintains the
/// per-application session identities.
#[derive(Clone)]
pub struct SessionManager {
    config: SessionConfig,
    applications: Arc<dyn ApplicationStore>,
    principals: Arc<dyn PrincipalResolver>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    #[must_use]
    pub fn new(
        config: SessionConfig,
        applications: Arc<dyn ApplicationStore>,
        principals: Arc<dyn PrincipalResolver>,
    ) -> Self {
        Self {
            config,
            applications,
            principals,
        }
    }

    /// Reads and merges the identities of both schemes.
    ///
    /// # Errors
    ///
    /// Returns the handler's error.
    pub async fn load_context(&self, handler: &dyn AuthenticationHandler) -> AuthResult<LoginContext> {
        let login = handler.authenticate(&self.config.login_scheme).await?;
        let sessions = handler.authenticate(&self.config.session_scheme).await?;
        Ok(LoginContext::merge(login, sessions))
    }

    /// Decides how a validated authorization request proceeds.
    ///
    /// # Errors
    ///
    /// Returns the handler's or the resolver's error.
    pub async fn can_log_in(
        &self,
        handler: &dyn AuthenticationHandler,
        request: &AuthorizationRequest,
    ) -> AuthResult<LoginDecision> {
        let context = self.load_context(handler).await?;

        let Some(user) = context.login() else {
            if request.prompt.none {
                tracing::info!(client_id = %request.client_id, "Login required with prompt=none");
                return Ok(LoginDecision::Forbidden(AuthorizationResponse::error(
                    request.redirect_uri.clone(),
                    request.response_mode,
                    request.state.as_deref(),
                    &ProtocolError::login_required(),
                )));
            }
            tracing::info!(client_id = %request.client_id, "Login required");
            return Ok(LoginDecision::LoginRequired);
        };

        if request.prompt.login {
            tracing::info!(client_id = %request.client_id, "Login forced by prompt=login");
            return Ok(LoginDecision::LoginRequired);
        }

        let application = self
            .principals
            .application_identity(&request.client_id)
            .await?;

        tracing::info!(
            client_id = %request.client_id,
            user_id = context.user_id().unwrap_or_default(),
            "Login authorized"
        );
        Ok(LoginDecision::Authorized {
            user: user.clone(),
            application,
        })
    }

    /// Records that `user` logged in to `application`.
    ///
    /// A session identity is added once per user and client; only the
    /// session scheme is signed in again.
    ///
    /// # Errors
    ///
    /// Returns the handler's or the store's error.
    pub async fn log_in(
        &self,
        handler: &dyn AuthenticationHandler,
        user: &Identity,
        application: &Identity,
    ) -> AuthResult<()> {
        let user_id = user.name_identifier().unwrap_or_default();
        let client_id = application
            .find_first(principal_claim_types::CLIENT_ID)
            .unwrap_or_default();

        let mut context = self.load_context(handler).await?;
        if context.find_session(user_id, client_id).is_some() {
            return Ok(());
        }

        let logout_uris = self.applications.logout_redirect_uris(client_id).await?;
        context.add_session(session_identity(user_id, client_id, &logout_uris));
        handler
            .sign_in(&self.config.session_scheme, context.sessions().to_vec())
            .await?;

        tracing::info!(client_id, user_id, "Session created");
        Ok(())
    }

    /// Signs the caller out and returns where to send them.
    ///
    /// Returns `None` when no post-logout redirect URI was requested.
    ///
    /// # Errors
    ///
    /// Returns a catalog error if the redirect URI is not registered by any
    /// of the caller's sessions, or the handler's error.
    pub async fn log_out(
        &self,
        handler: &dyn AuthenticationHandler,
        request: &LogoutRequest,
    ) -> AuthResult<Option<String>> {
        let context = self.load_context(handler).await?;

        let redirect = match &request.post_logout_redirect_uri {
            Some(uri) => {
                if context.find_by_logout_uri(uri).is_none() {
                    tracing::info!(uri = %uri, "Rejected unregistered logout redirect URI");
                    return Err(ProtocolError::invalid_logout_redirect_uri(uri).into());
                }
                Some(logout_redirect(uri, request.state.as_deref())?)
            }
            None => None,
        };

        for scheme in &self.config.sign_out_schemes {
            handler.sign_out(scheme).await?;
        }

        tracing::info!(
            user_id = context.user_id().unwrap_or_default(),
            "Logged out"
        );
        Ok(redirect)
    }
}

fn logout_redirect(uri: &str, state: Option<&str>) -> Result<String, ProtocolError> {
    let mut url = url::Url::parse(uri).map_err(|_| ProtocolError::invalid_uri_format(uri))?;
    if let Some(state) = state {
        url.query_pairs_mut().append_pair(names::STATE, state);
    }
    Ok(url.to_string())
}
