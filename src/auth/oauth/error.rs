//! OAuth2 error types.
//!
//! Every grant-flow failure is an [`OAuth2Error`] carrying a machine-readable
//! code. Provider rejections keep the provider's own code (for example
//! `invalid_grant`); local failures use one of the codes in [`codes`].
//!
//! # Example
//!
//! ```rust
//! use firefly_client::auth::oauth::{codes, OAuth2Error};
//!
//! let error = OAuth2Error::new(codes::NOT_CONFIGURED, "OAuth2 configuration is missing");
//! assert_eq!(
//!     error.to_string(),
//!     "OAuth2 error: oauth2_not_configured - OAuth2 configuration is missing"
//! );
//! ```

use serde::Deserialize;
use thiserror::Error;

use crate::clients::{BoxError, ClientError, ErrorKind};

/// Error codes produced by the client itself.
pub mod codes {
    /// No OAuth2 configuration is attached to the client.
    pub const NOT_CONFIGURED: &str = "oauth2_not_configured";
    /// A field required by the requested flow is empty.
    pub const CONFIGURATION_INCOMPLETE: &str = "oauth2_configuration_incomplete";
    /// The random anti-forgery state could not be generated.
    pub const STATE_GENERATION_FAILED: &str = "state_generation_failed";
    /// The client-credentials grant failed.
    pub const TOKEN_REQUEST_FAILED: &str = "token_request_failed";
    /// The authorization-code exchange failed.
    pub const CODE_EXCHANGE_FAILED: &str = "code_exchange_failed";
    /// The refresh-token grant failed.
    pub const TOKEN_REFRESH_FAILED: &str = "token_refresh_failed";
}

/// An OAuth2 failure.
///
/// Converts into a [`ClientError`] of kind [`ErrorKind::OAuth2`].
#[derive(Debug, Error)]
#[error("OAuth2 error: {error_code}{}", .error_description.as_ref().map(|d| format!(" - {d}")).unwrap_or_default())]
pub struct OAuth2Error {
    /// Machine-readable error code.
    pub error_code: String,
    /// Human-readable description.
    pub error_description: Option<String>,
    /// Link to documentation about the error, if the provider sent one.
    pub error_uri: Option<String>,
    /// The anti-forgery state of the flow, if known.
    pub state: Option<String>,
    /// HTTP status of the token endpoint response, if one was received.
    pub status: Option<u16>,
    #[source]
    source: Option<BoxError>,
}

impl OAuth2Error {
    /// Creates an error with a code and description.
    #[must_use]
    pub fn new(error_code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            error_description: Some(description.into()),
            error_uri: None,
            state: None,
            status: None,
            source: None,
        }
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches the HTTP status of the token endpoint response.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the flow's anti-forgery state.
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Builds an error from a provider's error response body, if it is one.
    ///
    /// Returns `None` unless the body is a JSON object with a non-empty
    /// `error` field.
    #[must_use]
    pub fn from_provider_body(body: &str) -> Option<Self> {
        let parsed: ProviderErrorBody = serde_json::from_str(body).ok()?;
        if parsed.error.is_empty() {
            return None;
        }
        Some(Self {
            error_code: parsed.error,
            error_description: parsed.error_description.filter(|d| !d.is_empty()),
            error_uri: parsed.error_uri.filter(|u| !u.is_empty()),
            state: None,
            status: None,
            source: None,
        })
    }
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: String,
    error_description: Option<String>,
    error_uri: Option<String>,
}

impl From<OAuth2Error> for ClientError {
    fn from(error: OAuth2Error) -> Self {
        let status = error.status;
        let client_error = Self::new(ErrorKind::OAuth2, error.to_string());
        let client_error = match status {
            Some(status) => client_error.with_status(status),
            None => client_error,
        };
        client_error.with_source(error)
    }
}

// Verify OAuth2Error is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OAuth2Error>();
};
