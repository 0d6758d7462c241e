//! OAuth2 client configuration.

use serde::Deserialize;

use super::newtypes::ClientSecret;

/// OAuth2 endpoints and client credentials for a Firefly III instance.
///
/// Every field is optional at construction time; each grant flow checks the
/// subset it needs when it runs and reports an incomplete configuration then.
/// Once attached to a [`ClientConfig`](super::ClientConfig) the value is
/// immutable.
///
/// # Example
///
/// ```rust
/// use firefly_client::OAuth2Config;
///
/// let config = OAuth2Config::new("client-id", "client-secret")
///     .with_scopes(["read", "write"])
///     .with_redirect_url("http://localhost:8080/callback")
///     .with_auth_url("https://firefly.example.com/oauth/authorize")
///     .with_token_url("https://firefly.example.com/oauth/token");
///
/// assert_eq!(config.client_id(), "client-id");
/// assert_eq!(config.scopes(), ["read", "write"]);
/// ```
///
/// The configuration can also be loaded from JSON:
///
/// ```rust
/// use firefly_client::OAuth2Config;
///
/// let config: OAuth2Config = serde_json::from_str(r#"{
///     "client_id": "abc",
///     "client_secret": "def",
///     "token_url": "https://firefly.example.com/oauth/token"
/// }"#).unwrap();
///
/// assert_eq!(config.token_url(), "https://firefly.example.com/oauth/token");
/// assert!(config.auth_url().is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OAuth2Config {
    client_id: String,
    client_secret: ClientSecret,
    scopes: Vec<String>,
    redirect_url: String,
    auth_url: String,
    token_url: String,
}

impl OAuth2Config {
    /// Creates a configuration with client credentials and no endpoints.
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: ClientSecret::new(client_secret),
            ..Self::default()
        }
    }

    /// Sets the requested scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the redirect URL used by the authorization-code flow.
    #[must_use]
    pub fn with_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = url.into();
        self
    }

    /// Sets the authorization endpoint.
    #[must_use]
    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    /// Sets the token endpoint.
    #[must_use]
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Returns the client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Returns the client secret.
    #[must_use]
    pub const fn client_secret(&self) -> &ClientSecret {
        &self.client_secret
    }

    /// Returns the requested scopes.
    #[must_use]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Returns the redirect URL.
    #[must_use]
    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Returns the authorization endpoint.
    #[must_use]
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Returns the token endpoint.
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods_set_fields() {
        let config = OAuth2Config::new("id", "secret")
            .with_scopes(vec!["read".to_string()])
            .with_redirect_url("http://localhost/cb")
            .with_auth_url("https://ff/auth")
            .with_token_url("https://ff/token");

        assert_eq!(config.client_id(), "id");
        assert_eq!(config.client_secret().as_ref(), "secret");
        assert_eq!(config.scopes(), ["read"]);
        assert_eq!(config.redirect_url(), "http://localhost/cb");
        assert_eq!(config.auth_url(), "https://ff/auth");
        assert_eq!(config.token_url(), "https://ff/token");
    }

    #[test]
    fn test_deserialize_missing_fields_default_to_empty() {
        let config: OAuth2Config = serde_json::from_str(r#"{"client_id": "x"}"#).unwrap();
        assert_eq!(config.client_id(), "x");
        assert!(config.client_secret().is_empty());
        assert!(config.scopes().is_empty());
    }

    #[test]
    fn test_debug_does_not_leak_secret() {
        let config = OAuth2Config::new("id", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }
}
