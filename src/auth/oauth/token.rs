//! OAuth2 bearer tokens.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// An access token issued by a grant flow.
///
/// The token stores the absolute expiry time; [`expires_in`](Self::expires_in)
/// derives the remaining lifetime from it on every call.
///
/// # Example
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use firefly_client::OAuth2Token;
///
/// let token = OAuth2Token::new("abc", "Bearer")
///     .with_expiry(Utc::now() + Duration::seconds(3600));
///
/// assert!(!token.is_expired());
/// assert_eq!(token.authorization_header(), "Bearer abc");
/// assert!(token.expires_in().unwrap() > 3500);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct OAuth2Token {
    /// The bearer access token.
    pub access_token: String,
    /// The token type, usually `Bearer`.
    pub token_type: String,
    /// When the access token stops being valid, if the provider said.
    pub expiry: Option<DateTime<Utc>>,
    /// The refresh token, if one was issued.
    pub refresh_token: Option<String>,
    /// The granted scope, if the provider reported it.
    pub scope: Option<String>,
}

impl OAuth2Token {
    /// Creates a token with no expiry, refresh token, or scope.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expiry: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Sets the expiry time.
    #[must_use]
    pub const fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Returns whole seconds until expiry (negative once expired), or `None`
    /// if the token has no known expiry.
    #[must_use]
    pub fn expires_in(&self) -> Option<i64> {
        self.expiry.map(|expiry| (expiry - Utc::now()).num_seconds())
    }

    /// Returns `true` if the expiry time has passed.
    ///
    /// Tokens without an expiry never expire.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|expiry| expiry <= Utc::now())
    }

    /// Returns the `Authorization` header value for this token.
    ///
    /// An empty token type is sent as `Bearer`.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        let token_type = if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer") {
            "Bearer"
        } else {
            &self.token_type
        };
        format!("{token_type} {}", self.access_token)
    }
}

impl fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("access_token", &"*****")
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "*****"))
            .field("scope", &self.scope)
            .finish()
    }
}

/// Successful token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Converts the relative `expires_in` into an absolute expiry at `now`.
    ///
    /// Returns `None` if the expiry is not representable.
    pub fn into_token(self, now: DateTime<Utc>) -> Option<OAuth2Token> {
        let expiry = match self.expires_in.filter(|secs| *secs > 0) {
            Some(secs) => Some(Duration::try_seconds(secs).and_then(|d| now.checked_add_signed(d))?),
            None => None,
        };

        Some(OAuth2Token {
            access_token: self.access_token,
            token_type: self.token_type,
            expiry,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            scope: self.scope.filter(|s| !s.is_empty()),
        })
    }
}
