//! OAuth2 Authorization Code Grant.
//!
//! 1. [`OAuth2Manager::authorization_url`] builds the URL the user visits.
//!    The returned [`AuthorizationRequest`] carries the anti-forgery state,
//!    which the caller must keep until the redirect comes back.
//! 2. [`OAuth2Manager::exchange_code`] trades the code from the redirect for
//!    a token.
//!
//! The URL always requests `access_type=offline` so that a refresh token is
//! issued.

use base64::prelude::*;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio_util::sync::CancellationToken;

use crate::auth::oauth::error::{codes, OAuth2Error};
use crate::auth::oauth::manager::{tag_state, Field, OAuth2Manager};
use crate::auth::oauth::token::OAuth2Token;
use crate::clients::ClientError;

/// Number of random bytes in a generated state.
pub const STATE_BYTES: usize = 32;

/// An authorization URL together with the state embedded in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRequest {
    /// The URL to send the user to.
    pub url: String,
    /// The anti-forgery state included in the URL.
    pub state: String,
}

/// Generates a random state: 32 bytes from the OS generator, URL-safe base64.
///
/// # Errors
///
/// Returns an [`OAuth2Error`] with code `state_generation_failed` if the OS
/// random source fails.
pub fn generate_state() -> Result<String, OAuth2Error> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|e| {
        OAuth2Error::new(
            codes::STATE_GENERATION_FAILED,
            format!("Failed to generate state: {e}"),
        )
        .with_source(e)
    })?;
    Ok(BASE64_URL_SAFE.encode(bytes))
}

impl OAuth2Manager {
    /// Builds the authorization URL for the authorization-code flow.
    ///
    /// Requires `client_id`, `auth_url`, and `redirect_url`. When `state` is
    /// `None` or empty a random one is generated.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] of kind [`OAuth2`](crate::ErrorKind::OAuth2)
    /// with code `oauth2_not_configured`, `oauth2_configuration_incomplete`,
    /// or `state_generation_failed`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use firefly_client::{OAuth2Config, OAuth2Manager};
    ///
    /// let config = OAuth2Config::new("my-client", "secret")
    ///     .with_auth_url("https://firefly.example.com/oauth/authorize")
    ///     .with_redirect_url("http://localhost:8080/callback")
    ///     .with_scopes(["read"]);
    /// let manager = OAuth2Manager::new(Some(config), reqwest::Client::new());
    ///
    /// let request = manager.authorization_url(Some("xyz")).unwrap();
    /// assert!(request.url.starts_with("https://firefly.example.com/oauth/authorize?"));
    /// assert!(request.url.contains("access_type=offline"));
    /// assert!(request.url.contains("state=xyz"));
    /// assert_eq!(request.state, "xyz");
    /// ```
    pub fn authorization_url(&self, state: Option<&str>) -> Result<AuthorizationRequest, ClientError> {
        let config = self.require(&[Field::ClientId, Field::AuthUrl, Field::RedirectUrl])?;

        let state = match state.filter(|s| !s.is_empty()) {
            Some(state) => state.to_string(),
            None => generate_state()?,
        };

        let scope = config.scopes().join(" ");
        let mut params = vec![
            ("access_type", "offline"),
            ("client_id", config.client_id()),
            ("redirect_uri", config.redirect_url()),
            ("response_type", "code"),
        ];
        if !scope.is_empty() {
            params.push(("scope", scope.as_str()));
        }
        params.push(("state", state.as_str()));

        let query = params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let auth_url = config.auth_url();
        let separator = if auth_url.contains('?') { '&' } else { '?' };

        Ok(AuthorizationRequest {
            url: format!("{auth_url}{separator}{query}"),
            state,
        })
    }

    /// Exchanges an authorization code for a token.
    ///
    /// Requires `client_id`, `client_secret`, and `token_url`. The configured
    /// `redirect_url` is sent as `redirect_uri` when set. `state` is the value
    /// from [`authorization_url`](Self::authorization_url); it is not sent,
    /// but every [`OAuth2Error`] from the exchange carries it.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] of kind [`OAuth2`](crate::ErrorKind::OAuth2);
    /// failures other than configuration or provider errors use the code
    /// `code_exchange_failed`. Returns kind
    /// [`Cancelled`](crate::ErrorKind::Cancelled) if `cancel` fires.
    pub async fn exchange_code(
        &self,
        cancel: &CancellationToken,
        code: &str,
        state: Option<&str>,
    ) -> Result<OAuth2Token, ClientError> {
        let config = self
            .require(&[Field::ClientId, Field::ClientSecret, Field::TokenUrl])
            .map_err(|e| tag_state(e, state))?;

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", config.client_id()),
            ("client_secret", config.client_secret().as_ref()),
        ];
        if !config.redirect_url().is_empty() {
            form.push(("redirect_uri", config.redirect_url()));
        }

        self.request_token(
            cancel,
            config.token_url(),
            &form,
            codes::CODE_EXCHANGE_FAILED,
            state,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OAuth2Config;
    use crate::ErrorKind;

    fn manager() -> OAuth2Manager {
        let config = OAuth2Config::new("client id", "secret")
            .with_auth_url("https://ff.example.com/oauth/authorize")
            .with_redirect_url("http://localhost/callback")
            .with_scopes(["read", "write"]);
        OAuth2Manager::new(Some(config), reqwest::Client::new())
    }

    #[test]
    fn test_generated_state_is_url_safe_and_full_length() {
        let state = generate_state().unwrap();
        let decoded = BASE64_URL_SAFE.decode(&state).unwrap();
        assert_eq!(decoded.len(), STATE_BYTES);
        assert!(!state.contains('+') && !state.contains('/'));
    }

    #[test]
    fn test_url_parameters_are_sorted_and_encoded() {
        let request = manager().authorization_url(Some("s1")).unwrap();
        assert_eq!(
            request.url,
            "https://ff.example.com/oauth/authorize?access_type=offline&client_id=client%20id\
             &redirect_uri=http%3A%2F%2Flocalhost%2Fcallback&response_type=code\
             &scope=read%20write&state=s1"
        );
    }

    #[test]
    fn test_generated_states_are_distinct() {
        let manager = manager();
        let first = manager.authorization_url(None).unwrap();
        let second = manager.authorization_url(Some("")).unwrap();

        assert!(!first.state.is_empty());
        assert_ne!(first.state, second.state);
        assert!(first.url.contains("state="));
    }

    #[test]
    fn test_existing_query_uses_ampersand() {
        let config = OAuth2Config::new("id", "")
            .with_auth_url("https://ff/authorize?prompt=consent")
            .with_redirect_url("http://cb");
        let manager = OAuth2Manager::new(Some(config), reqwest::Client::new());

        let request = manager.authorization_url(Some("x")).unwrap();
        assert!(request.url.starts_with("https://ff/authorize?prompt=consent&access_type=offline"));
    }

    #[tokio::test]
    async fn test_exchange_errors_carry_state() {
        let manager = OAuth2Manager::new(None, reqwest::Client::new());
        let error = manager
            .exchange_code(&CancellationToken::new(), "code", Some("st-9"))
            .await
            .unwrap_err();

        let cause = error.cause::<OAuth2Error>().unwrap();
        assert_eq!(cause.error_code, codes::NOT_CONFIGURED);
        assert_eq!(cause.state.as_deref(), Some("st-9"));
    }

    #[test]
    fn test_missing_redirect_is_incomplete() {
        let config = OAuth2Config::new("id", "").with_auth_url("https://ff/authorize");
        let manager = OAuth2Manager::new(Some(config), reqwest::Client::new());

        let error = manager.authorization_url(None).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::OAuth2);
        assert_eq!(
            error.cause::<OAuth2Error>().unwrap().error_code,
            codes::CONFIGURATION_INCOMPLETE
        );
    }
}
