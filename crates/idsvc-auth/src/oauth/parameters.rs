//! Request parameter collection.

use crate::oauth::errors::ProtocolError;

/// Parameter names read and written by the engine.
pub mod names {
    pub const RESPONSE_TYPE: &str = "response_type";
    pub const RESPONSE_MODE: &str = "response_mode";
    pub const CLIENT_ID: &str = "client_id";
    pub const CLIENT_SECRET: &str = "client_secret";
    pub const REDIRECT_URI: &str = "redirect_uri";
    pub const SCOPE: &str = "scope";
    pub const NONCE: &str = "nonce";
    pub const STATE: &str = "state";
    pub const PROMPT: &str = "prompt";
    pub const CODE_CHALLENGE: &str = "code_challenge";
    pub const CODE_CHALLENGE_METHOD: &str = "code_challenge_method";
    pub const CODE_VERIFIER: &str = "code_verifier";
    pub const GRANT_TYPE: &str = "grant_type";
    pub const CODE: &str = "code";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    pub const POST_LOGOUT_REDIRECT_URI: &str = "post_logout_redirect_uri";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const ID_TOKEN: &str = "id_token";
    pub const TOKEN_TYPE: &str = "token_type";
    pub const EXPIRES_IN: &str = "expires_in";
}

/// An ordered multimap of request parameters.
///
/// Parameters keep their arrival order and may repeat; the protocol forbids
/// repetition for every parameter the engine reads, which [`Parameters::single`]
/// enforces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: Vec<(String, String)>,
}

impl Parameters {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string.
    #[must_use]
    pub fn from_form(input: &str) -> Self {
        let entries = url::form_urlencoded::parse(input.as_bytes())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        Self { entries }
    }

    /// Adds a parameter, keeping existing values of the same name.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(name, value);
        self
    }

    /// Adds a parameter, keeping existing values of the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// First value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    /// Every value of `name`, in arrival order.
    pub fn get_all<'a, 'b>(
        &'a self,
        name: &'b str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'b> {
        self.entries
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if at least one value of `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The single value of an optional parameter.
    ///
    /// # Errors
    ///
    /// Returns a catalog error if the parameter is repeated.
    pub fn single(&self, name: &str) -> Result<Option<&str>, ProtocolError> {
        let mut values = self.get_all(name);
        let first = values.next();
        if values.next().is_some() {
            return Err(ProtocolError::too_many_parameters(name));
        }
        Ok(first)
    }

    /// The single value of a required parameter.
    ///
    /// An empty value counts as missing.
    ///
    /// # Errors
    ///
    /// Returns a catalog error if the parameter is missing or repeated.
    pub fn required(&self, name: &str) -> Result<&str, ProtocolError> {
        match self.single(name)? {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ProtocolError::missing_required_parameter(name)),
        }
    }

    /// Iterates over all parameters.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Parameters {
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_form() {
        let params = Parameters::from_form("scope=openid%20profile&state=a+b&scope=email");
        assert_eq!(params.get(names::SCOPE), Some("openid profile"));
        assert_eq!(params.get(names::STATE), Some("a b"));
        assert_eq!(params.get_all(names::SCOPE).count(), 2);
    }

    #[test]
    fn test_single_rejects_duplicates() {
        let params = Parameters::new()
            .with(names::STATE, "1")
            .with(names::STATE, "2");
        let error = params.single(names::STATE).unwrap_err();
        assert_eq!(error, ProtocolError::too_many_parameters(names::STATE));
        assert_eq!(params.single(names::NONCE).unwrap(), None);
    }

    #[test]
    fn test_values_outlive_lookup_name() {
        let params = Parameters::new().with("resource", "orders-api");
        let value = {
            let name = String::from("resource");
            params.single(&name).unwrap()
        };
        let first = {
            let name = String::from("resource");
            params.get(&name)
        };
        assert_eq!(value, Some("orders-api"));
        assert_eq!(first, Some("orders-api"));
    }

    #[test]
    fn test_required() {
        let params: Parameters = [(names::CLIENT_ID, "app"), (names::NONCE, "")]
            .into_iter()
            .collect();
        assert_eq!(params.required(names::CLIENT_ID).unwrap(), "app");
        assert_eq!(
            params.required(names::NONCE).unwrap_err(),
            ProtocolError::missing_required_parameter(names::NONCE)
        );
        assert_eq!(
            params.required(names::CODE).unwrap_err(),
            ProtocolError::missing_required_parameter(names::CODE)
        );
    }
}
