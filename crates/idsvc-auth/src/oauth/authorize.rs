//! Authorization endpoint request validation and responses.
//!
//! [`AuthorizationRequest::from_parameters`] validates the raw request
//! against the registered [`Application`] and yields a request whose scopes,
//! response type, response mode and prompt are resolved. Validation stops at
//! the first problem and reports it with a catalog [`ProtocolError`].
//!
//! # Example
//!
//! ```ignore
//! GET /authorize?
//!   response_type=code
//!   &client_id=my-app
//!   &redirect_uri=https://app.example.com/callback
//!   &scope=openid api.read
//!   &state=abc123xyz
//!   &nonce=n-0S6_WzA2Mj
//!   &code_challenge=E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM
//!   &code_challenge_method=S256
//! ```

use std::fmt;

use crate::AuthResult;
use crate::claims::context::IssuedTokens;
use crate::claims::providers::grantable_tokens;
use crate::oauth::errors::ProtocolError;
use crate::oauth::parameters::{Parameters, names};
use crate::oauth::pkce::{CHALLENGE_LENGTH, PkceChallengeMethod};
use crate::storage::ApplicationStore;
use crate::types::{Application, ApplicationScope, GrantType, scope::OPENID};
use crate::types::application::is_absolute_without_fragment;

// =============================================================================
// Response type
// =============================================================================

/// The set of values of the `response_type` parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseType {
    code: bool,
    id_token: bool,
}

impl ResponseType {
    /// `code`
    pub const CODE: Self = Self {
        code: true,
        id_token: false,
    };

    /// `none`
    pub const NONE: Self = Self {
        code: false,
        id_token: false,
    };

    /// Parses a space-separated `response_type` value.
    ///
    /// # Errors
    ///
    /// Returns a catalog error for unknown or repeated values and for `none`
    /// combined with anything else.
    pub fn parse(value: &str) -> Result<Self, ProtocolError> {
        let values: Vec<&str> = value.split_whitespace().collect();
        if values.is_empty() {
            return Err(ProtocolError::missing_required_parameter(names::RESPONSE_TYPE));
        }

        let mut response_type = Self::NONE;
        let mut none = false;
        for item in &values {
            let slot = match *item {
                "code" => &mut response_type.code,
                "id_token" => &mut response_type.id_token,
                "none" => &mut none,
                _ => {
                    return Err(ProtocolError::invalid_parameter_value(
                        value,
                        names::RESPONSE_TYPE,
                    ));
                }
            };
            if *slot {
                return Err(ProtocolError::invalid_parameter_value(
                    value,
                    names::RESPONSE_TYPE,
                ));
            }
            *slot = true;
        }

        if none && values.len() > 1 {
            return Err(ProtocolError::response_type_none_not_allowed());
        }
        Ok(response_type)
    }

    /// Requests an authorization code.
    #[must_use]
    pub fn includes_code(&self) -> bool {
        self.code
    }

    /// Requests an ID token from the authorization endpoint.
    #[must_use]
    pub fn includes_id_token(&self) -> bool {
        self.id_token
    }

    /// Requests no token at all.
    #[must_use]
    pub fn is_none(&self) -> bool {
        !self.code && !self.id_token
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.id_token) {
            (true, true) => f.write_str("code id_token"),
            (true, false) => f.write_str("code"),
            (false, true) => f.write_str("id_token"),
            (false, false) => f.write_str("none"),
        }
    }
}

// =============================================================================
// Response mode
// =============================================================================

/// How the authorization response reaches the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Query,
    Fragment,
    FormPost,
}

impl ResponseMode {
    /// Parses a `response_mode` value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "query" => Some(Self::Query),
            "fragment" => Some(Self::Fragment),
            "form_post" => Some(Self::FormPost),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Fragment => "fragment",
            Self::FormPost => "form_post",
        }
    }

    /// Default mode of a response type: tokens go into the fragment.
    #[must_use]
    pub fn default_for(response_type: ResponseType) -> Self {
        if response_type.includes_id_token() {
            Self::Fragment
        } else {
            Self::Query
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Prompt
// =============================================================================

/// Values of the `prompt` parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Prompt {
    pub none: bool,
    pub login: bool,
    pub consent: bool,
    pub select_account: bool,
}

impl Prompt {
    /// Parses a space-separated `prompt` value.
    ///
    /// # Errors
    ///
    /// Returns a catalog error for unknown or repeated values and for `none`
    /// combined with another value.
    pub fn parse(value: &str) -> Result<Self, ProtocolError> {
        let mut prompt = Self::default();
        let mut count = 0;

        for item in value.split_whitespace() {
            let slot = match item {
                "none" => &mut prompt.none,
                "login" => &mut prompt.login,
                "consent" => &mut prompt.consent,
                "select_account" => &mut prompt.select_account,
                other => return Err(ProtocolError::invalid_prompt_value(other)),
            };
            if *slot {
                return Err(ProtocolError::duplicate_prompt_value(item));
            }
            *slot = true;
            count += 1;
        }

        if prompt.none && count > 1 {
            return Err(ProtocolError::invalid_prompt_value(value));
        }
        Ok(prompt)
    }
}

// =============================================================================
// Authorization request
// =============================================================================

/// A validated authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub client_id: String,
    pub redirect_uri: String,
    pub response_type: ResponseType,
    pub response_mode: ResponseMode,
    /// Resolved scopes, in request order without duplicates.
    pub scopes: Vec<ApplicationScope>,
    pub nonce: Option<String>,
    pub state: Option<String>,
    pub prompt: Prompt,
    pub code_challenge: Option<String>,
    pub code_challenge_method: Option<PkceChallengeMethod>,
    /// The raw parameters, kept for the claim providers.
    pub parameters: Parameters,
}

impl AuthorizationRequest {
    /// Validates an authorization request for `application`.
    ///
    /// `application` is the registration found for the request's `client_id`,
    /// if any.
    ///
    /// # Errors
    ///
    /// Returns the catalog error of the first problem found.
    pub fn from_parameters(
        parameters: Parameters,
        application: Option<&Application>,
    ) -> Result<Self, ProtocolError> {
        let client_id = parameters.required(names::CLIENT_ID)?;
        let application = application
            .filter(|a| a.client_id == client_id)
            .ok_or_else(|| ProtocolError::invalid_client_id(client_id))?;

        let redirect_uri = parameters.required(names::REDIRECT_URI)?;
        if !is_absolute_without_fragment(redirect_uri) {
            return Err(ProtocolError::invalid_uri_format(redirect_uri));
        }
        if !application.is_redirect_uri_allowed(redirect_uri) {
            return Err(ProtocolError::invalid_redirect_uri(redirect_uri));
        }

        let response_type = ResponseType::parse(parameters.required(names::RESPONSE_TYPE)?)?;
        if response_type.includes_code()
            && !application.is_grant_type_allowed(GrantType::AuthorizationCode)
        {
            return Err(ProtocolError::invalid_grant_type(
                GrantType::AuthorizationCode.as_str(),
            ));
        }

        let response_mode = match parameters.single(names::RESPONSE_MODE)? {
            None => ResponseMode::default_for(response_type),
            Some(value) => ResponseMode::parse(value).ok_or_else(|| {
                ProtocolError::invalid_parameter_value(value, names::RESPONSE_MODE)
            })?,
        };
        if response_type.includes_id_token() && response_mode == ResponseMode::Query {
            return Err(ProtocolError::invalid_response_type_mode_combination(
                &response_type.to_string(),
                response_mode.as_str(),
            ));
        }

        let scope = parameters.required(names::SCOPE)?;
        let scopes = resolve_scopes(scope, application)?;
        if response_type.includes_id_token()
            && !scopes.iter().any(|s| s.is_canonical_named(OPENID))
        {
            return Err(ProtocolError::missing_openid_scope());
        }
        if response_type.includes_code() && grantable_tokens(&scopes).is_empty() {
            return Err(ProtocolError::invalid_scope(scope));
        }

        let nonce = parameters.single(names::NONCE)?.map(str::to_string);
        if response_type.includes_id_token() && nonce.as_deref().is_none_or(str::is_empty) {
            return Err(ProtocolError::missing_required_parameter(names::NONCE));
        }

        let state = parameters.single(names::STATE)?.map(str::to_string);

        let prompt = match parameters.single(names::PROMPT)? {
            Some(value) => Prompt::parse(value)?,
            None => Prompt::default(),
        };

        let code_challenge = parameters.single(names::CODE_CHALLENGE)?;
        let code_challenge_method = parameters.single(names::CODE_CHALLENGE_METHOD)?;
        let code_challenge_method = match (code_challenge, code_challenge_method) {
            (None, None) => None,
            (None, Some(_)) => {
                return Err(ProtocolError::missing_required_parameter(
                    names::CODE_CHALLENGE,
                ));
            }
            (Some(challenge), method) => {
                let method = method.unwrap_or("plain");
                let method = PkceChallengeMethod::parse(method)
                    .map_err(|_| ProtocolError::invalid_code_challenge_method(method))?;
                if challenge.len() != CHALLENGE_LENGTH {
                    return Err(ProtocolError::invalid_code_challenge_length());
                }
                Some(method)
            }
        };

        Ok(Self {
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            response_type,
            response_mode,
            scopes,
            nonce,
            state,
            prompt,
            code_challenge: code_challenge.map(str::to_string),
            code_challenge_method,
            parameters,
        })
    }
}

/// Looks up the client and validates the request.
///
/// # Errors
///
/// Returns a storage error, or the catalog error of the first problem found.
pub async fn validate_authorization_request(
    parameters: Parameters,
    applications: &dyn ApplicationStore,
) -> AuthResult<AuthorizationRequest> {
    let client_id = parameters.required(names::CLIENT_ID)?.to_string();
    let application = applications.find_by_client_id(&client_id).await?;

    AuthorizationRequest::from_parameters(parameters, application.as_ref()).map_err(|error| {
        tracing::debug!(client_id = %client_id, error = %error, "Rejected authorization request");
        error.into()
    })
}

/// Resolves a space-separated scope value against the registration.
///
/// # Errors
///
/// Returns a catalog error for unknown scopes and for scopes owned by more
/// than one resource.
pub fn resolve_scopes(
    scope: &str,
    application: &Application,
) -> Result<Vec<ApplicationScope>, ProtocolError> {
    let mut scopes: Vec<ApplicationScope> = Vec::new();

    for name in scope.split_whitespace() {
        let resolved = application
            .resolve_scope(name)
            .ok_or_else(|| ProtocolError::invalid_scope(name))?;
        if !scopes.contains(&resolved) {
            scopes.push(resolved);
        }
    }

    let mut owners = scopes.iter().filter_map(|s| s.owner.as_deref());
    if let Some(first) = owners.next() {
        if let Some(second) = owners.find(|o| *o != first) {
            return Err(ProtocolError::multiple_resources_not_supported(first, second));
        }
    }

    Ok(scopes)
}

// =============================================================================
// Authorization response
// =============================================================================

/// The response delivered to the client's redirect URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub redirect_uri: String,
    pub response_mode: ResponseMode,
    parameters: Vec<(String, String)>,
}

impl AuthorizationResponse {
    /// Successful response carrying the issued tokens and the state.
    #[must_use]
    pub fn success(request: &AuthorizationRequest, issued: &IssuedTokens) -> Self {
        let mut parameters = Vec::new();
        if let Some(code) = &issued.code {
            parameters.push((names::CODE.to_string(), code.clone()));
        }
        if let Some(id_token) = &issued.id_token {
            parameters.push((names::ID_TOKEN.to_string(), id_token.clone()));
        }
        if let Some(state) = &request.state {
            parameters.push((names::STATE.to_string(), state.clone()));
        }

        Self {
            redirect_uri: request.redirect_uri.clone(),
            response_mode: request.response_mode,
            parameters,
        }
    }

    /// Error response carrying the error parameters and the state.
    #[must_use]
    pub fn error(
        redirect_uri: impl Into<String>,
        response_mode: ResponseMode,
        state: Option<&str>,
        error: &ProtocolError,
    ) -> Self {
        let mut parameters: Vec<(String, String)> = error
            .to_parameters()
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        if let Some(state) = state {
            parameters.push((names::STATE.to_string(), state.to_string()));
        }

        Self {
            redirect_uri: redirect_uri.into(),
            response_mode,
            parameters,
        }
    }

    /// Response parameters in delivery order.
    #[must_use]
    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    /// First value of a response parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Builds the redirect URL.
    ///
    /// For `form_post` the parameters travel in the body, so the bare
    /// redirect URI is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect URI is not a valid URL.
    pub fn to_redirect_url(&self) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(&self.redirect_uri)?;
        match self.response_mode {
            ResponseMode::Query => {
                url.query_pairs_mut().extend_pairs(&self.parameters);
            }
            ResponseMode::Fragment => {
                let fragment = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&self.parameters)
                    .finish();
                url.set_fragment(Some(&fragment));
            }
            ResponseMode::FormPost => {}
        }
        Ok(url.to_string())
    }
}
