//! The OAuth2 token manager and the token request shared by every grant flow.

use tokio_util::sync::CancellationToken;

use crate::auth::oauth::error::{codes, OAuth2Error};
use crate::auth::oauth::token::{OAuth2Token, TokenResponse};
use crate::clients::ClientError;
use crate::config::OAuth2Config;

/// Runs OAuth2 grant flows against the endpoints of an [`OAuth2Config`].
///
/// The manager is stateless apart from its configuration: it neither caches
/// nor refreshes tokens on its own. Callers decide when to refresh (see
/// [`OAuth2Token::is_expired`]).
///
/// Grant flows are implemented in:
/// - [`client_credentials_token`](Self::client_credentials_token)
/// - [`authorization_url`](Self::authorization_url) and [`exchange_code`](Self::exchange_code)
/// - [`refresh_token`](Self::refresh_token)
#[derive(Clone, Debug)]
pub struct OAuth2Manager {
    config: Option<OAuth2Config>,
    http: reqwest::Client,
}

// Verify OAuth2Manager is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuth2Manager>();
};

/// Fields a flow may require.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Field {
    ClientId,
    ClientSecret,
    AuthUrl,
    TokenUrl,
    RedirectUrl,
}

impl Field {
    const fn name(self) -> &'static str {
        match self {
            Self::ClientId => "client_id",
            Self::ClientSecret => "client_secret",
            Self::AuthUrl => "auth_url",
            Self::TokenUrl => "token_url",
            Self::RedirectUrl => "redirect_url",
        }
    }

    fn is_set(self, config: &OAuth2Config) -> bool {
        let value = match self {
            Self::ClientId => config.client_id(),
            Self::ClientSecret => config.client_secret().as_ref(),
            Self::AuthUrl => config.auth_url(),
            Self::TokenUrl => config.token_url(),
            Self::RedirectUrl => config.redirect_url(),
        };
        !value.trim().is_empty()
    }
}

impl OAuth2Manager {
    /// Creates a manager sending token requests through `http`.
    #[must_use]
    pub const fn new(config: Option<OAuth2Config>, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Returns the OAuth2 configuration, if any.
    #[must_use]
    pub const fn config(&self) -> Option<&OAuth2Config> {
        self.config.as_ref()
    }

    /// Returns the configuration after checking that `required` fields are set.
    pub(crate) fn require(&self, required: &[Field]) -> Result<&OAuth2Config, OAuth2Error> {
        let config = self.config.as_ref().ok_or_else(|| {
            OAuth2Error::new(codes::NOT_CONFIGURED, "OAuth2 configuration is missing")
        })?;

        if required.iter().all(|field| field.is_set(config)) {
            return Ok(config);
        }

        let names: Vec<&str> = required.iter().map(|field| field.name()).collect();
        let list = match names.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{}, and {last}", rest.join(", ")),
            Some((last, _)) => (*last).to_string(),
            None => String::new(),
        };
        Err(OAuth2Error::new(
            codes::CONFIGURATION_INCOMPLETE,
            format!("{list} are required"),
        ))
    }

    /// Posts a form-encoded grant to the token endpoint and parses the token.
    ///
    /// Provider error bodies are surfaced with their own code; every other
    /// failure uses `failure_code` and keeps the underlying error as source.
    /// A known `state` is attached to every OAuth2 failure.
    pub(crate) async fn request_token(
        &self,
        cancel: &CancellationToken,
        token_url: &str,
        form: &[(&str, &str)],
        failure_code: &'static str,
        state: Option<&str>,
    ) -> Result<OAuth2Token, ClientError> {
        let request = self
            .http
            .post(token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(form);

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::cancelled()),
            result = request.send() => result.map_err(|e| {
                tag_state(
                    OAuth2Error::new(failure_code, format!("Token request failed: {e}")).with_source(e),
                    state,
                )
            })?,
        };

        let status = response.status();
        let body = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::cancelled()),
            result = response.text() => result.map_err(|e| {
                tag_state(
                    OAuth2Error::new(failure_code, format!("Failed to read token response: {e}"))
                        .with_status(status.as_u16())
                        .with_source(e),
                    state,
                )
            })?,
        };

        if !status.is_success() {
            let error = OAuth2Error::from_provider_body(&body).unwrap_or_else(|| {
                OAuth2Error::new(
                    failure_code,
                    format!("Token endpoint returned HTTP {}: {}", status.as_u16(), body.trim()),
                )
            });
            return Err(tag_state(error.with_status(status.as_u16()), state).into());
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            tag_state(
                OAuth2Error::new(failure_code, format!("Invalid token response: {e}"))
                    .with_status(status.as_u16())
                    .with_source(e),
                state,
            )
        })?;

        if parsed.access_token.is_empty() {
            let error = OAuth2Error::new(failure_code, "Token response has no access_token");
            return Err(tag_state(error.with_status(status.as_u16()), state).into());
        }

        parsed.into_token(chrono::Utc::now()).ok_or_else(|| {
            let error = OAuth2Error::new(failure_code, "Token response has an invalid expires_in");
            tag_state(error.with_status(status.as_u16()), state).into()
        })
    }
}

/// Attaches `state` to `error` when the flow has one.
pub(crate) fn tag_state(error: OAuth2Error, state: Option<&str>) -> OAuth2Error {
    match state.filter(|s| !s.is_empty()) {
        Some(state) => error.with_state(state),
        None => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(config: Option<OAuth2Config>) -> OAuth2Manager {
        OAuth2Manager::new(config, reqwest::Client::new())
    }

    #[test]
    fn test_missing_config_is_not_configured() {
        let error = manager(None).require(&[Field::ClientId]).unwrap_err();
        assert_eq!(error.error_code, codes::NOT_CONFIGURED);
    }

    #[test]
    fn test_incomplete_config_lists_required_fields() {
        let config = OAuth2Config::new("id", "");
        let error = manager(Some(config))
            .require(&[Field::ClientId, Field::ClientSecret, Field::TokenUrl])
            .unwrap_err();

        assert_eq!(error.error_code, codes::CONFIGURATION_INCOMPLETE);
        assert_eq!(
            error.error_description.as_deref(),
            Some("client_id, client_secret, and token_url are required")
        );
    }

    #[test]
    fn test_tag_state_skips_empty_state() {
        let error = OAuth2Error::new(codes::CODE_EXCHANGE_FAILED, "x");
        assert_eq!(tag_state(error, Some("")).state, None);

        let error = OAuth2Error::new(codes::CODE_EXCHANGE_FAILED, "x");
        assert_eq!(tag_state(error, Some("st")).state.as_deref(), Some("st"));
    }

    #[test]
    fn test_complete_config_passes() {
        let config = OAuth2Config::new("id", "secret").with_token_url("https://ff/oauth/token");
        assert!(manager(Some(config))
            .require(&[Field::ClientId, Field::ClientSecret, Field::TokenUrl])
            .is_ok());
    }
}
