//! Error classification for the Firefly III client.
//!
//! Every failure the client surfaces is a [`ClientError`] tagged with exactly
//! one [`ErrorKind`]. The kind decides whether the retry engine tries again;
//! the wrapped cause keeps the original detail available through
//! [`std::error::Error::source`].
//!
//! # Classification
//!
//! | Input | Kind |
//! |-------|------|
//! | 401 | [`ErrorKind::Auth`] |
//! | 403 | [`ErrorKind::Authorization`] |
//! | 404 | [`ErrorKind::NotFound`] |
//! | 408 | [`ErrorKind::Timeout`] |
//! | 409 | [`ErrorKind::Duplicate`] |
//! | 429 | [`ErrorKind::RateLimit`] |
//! | other 4xx | [`ErrorKind::Client`] |
//! | 5xx | [`ErrorKind::Server`] |
//! | transport timeout, deadline elapsed | [`ErrorKind::Timeout`] |
//! | other transport failure | [`ErrorKind::Network`] |
//! | cancellation | [`ErrorKind::Cancelled`] |
//!
//! # Example
//!
//! ```rust
//! use firefly_client::{ClientError, ErrorKind};
//!
//! assert_eq!(ClientError::classify_status(429), ErrorKind::RateLimit);
//! assert_eq!(ClientError::classify_status(404), ErrorKind::NotFound);
//!
//! let error = ClientError::cancelled();
//! assert_eq!(error.kind().code(), "cancelled");
//! ```

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Boxed error used as the cause of a [`ClientError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Maximum number of characters of a response body kept in [`HttpStatusError`].
pub const BODY_EXCERPT_LEN: usize = 512;

/// Response headers recorded on [`HttpStatusError`].
pub const RECORDED_HEADERS: [&str; 3] = ["content-type", "x-request-id", "x-ratelimit-remaining"];

/// The category of a client failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A request failed local validation before it was sent.
    Validation,
    /// The requested resource does not exist (404).
    NotFound,
    /// The resource already exists (409).
    Duplicate,
    /// The server rejected the request because of rate limiting (429).
    RateLimit,
    /// The transport failed before a response arrived.
    Network,
    /// The request or a wait exceeded its deadline.
    Timeout,
    /// The server failed to handle the request (5xx).
    Server,
    /// The server rejected the request as malformed (other 4xx).
    Client,
    /// Credentials were missing or rejected (401).
    Auth,
    /// Credentials were valid but lack permission (403).
    Authorization,
    /// An OAuth2 grant flow failed.
    OAuth2,
    /// The caller cancelled the operation.
    Cancelled,
    /// An inbound payload could not be parsed.
    Parse,
}

impl ErrorKind {
    /// Returns the stable machine-readable code for this kind.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "validation_error",
            Self::NotFound => "not_found",
            Self::Duplicate => "duplicate_entry",
            Self::RateLimit => "rate_limit",
            Self::Network => "network_error",
            Self::Timeout => "timeout_error",
            Self::Server => "server_error",
            Self::Client => "api_failure",
            Self::Auth => "authentication_failed",
            Self::Authorization => "authorization_failed",
            Self::OAuth2 => "oauth2_error",
            Self::Cancelled => "cancelled",
            Self::Parse => "parse_error",
        }
    }

    /// Returns a short human-readable title.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Validation => "Invalid Request",
            Self::NotFound => "Resource Not Found",
            Self::Duplicate => "Duplicate Resource",
            Self::RateLimit => "Rate Limit Exceeded",
            Self::Network => "Network Error",
            Self::Timeout => "Request Timeout",
            Self::Server => "Server Error",
            Self::Client => "Client Error",
            Self::Auth => "Authentication Failed",
            Self::Authorization => "Authorization Failed",
            Self::OAuth2 => "OAuth2 Error",
            Self::Cancelled => "Request Cancelled",
            Self::Parse => "Invalid Payload",
        }
    }

    /// Returns a remediation hint, if one applies.
    #[must_use]
    pub const fn help(self) -> Option<&'static str> {
        match self {
            Self::Auth => Some("Check your API token or OAuth2 credentials"),
            Self::Authorization => Some("Check your permissions for this resource"),
            Self::Network => Some("Check your network connection and Firefly III URL"),
            Self::Timeout => Some("Request took too long to complete"),
            Self::Server => Some("Firefly III server encountered an error"),
            Self::Client | Self::Validation => Some("Check your request parameters"),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A classified client failure.
///
/// Construct through the classification helpers ([`ClientError::from_status`],
/// [`ClientError::from_transport`], [`ClientError::cancelled`],
/// [`ClientError::deadline_elapsed`]) or directly with [`ClientError::new`].
///
/// # Example
///
/// ```rust
/// use firefly_client::{ClientError, ErrorKind};
///
/// let error = ClientError::new(ErrorKind::Server, "upstream failed").with_status(503);
/// assert_eq!(error.kind(), ErrorKind::Server);
/// assert_eq!(error.status(), Some(503));
/// assert_eq!(error.to_string(), "server_error: upstream failed");
/// ```
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ClientError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    #[source]
    source: Option<BoxError>,
}

impl ClientError {
    /// Creates an error of the given kind without a cause.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Attaches the HTTP status code that produced this error.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code, if the error came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the remediation hint for this error's kind.
    #[must_use]
    pub const fn help(&self) -> Option<&'static str> {
        self.kind.help()
    }

    /// Returns the wrapped cause downcast to `E`, if it is one.
    #[must_use]
    pub fn cause<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_deref().and_then(|e| e.downcast_ref::<E>())
    }

    /// Maps a failing HTTP status code (400 and above) to an error kind.
    #[must_use]
    pub const fn classify_status(status: u16) -> ErrorKind {
        match status {
            401 => ErrorKind::Auth,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            409 => ErrorKind::Duplicate,
            429 => ErrorKind::RateLimit,
            500.. => ErrorKind::Server,
            _ => ErrorKind::Client,
        }
    }

    /// Builds a classified error from a non-success response.
    #[must_use]
    pub fn from_status(error: HttpStatusError) -> Self {
        let kind = Self::classify_status(error.code);
        Self::new(kind, kind.title())
            .with_status(error.code)
            .with_source(error)
    }

    /// Classifies a transport failure reported by `reqwest`.
    #[must_use]
    pub fn from_transport(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            let kind = Self::classify_status(status.as_u16());
            return Self::new(kind, kind.title())
                .with_status(status.as_u16())
                .with_source(error);
        }
        let kind = if error.is_timeout() {
            ErrorKind::Timeout
        } else {
            ErrorKind::Network
        };
        Self::new(kind, kind.title()).with_source(error)
    }

    /// Creates the error returned when a cancellation token fires.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, ErrorKind::Cancelled.title())
    }

    /// Classifies a deadline imposed with [`tokio::time::timeout`].
    #[must_use]
    pub fn deadline_elapsed(error: tokio::time::error::Elapsed) -> Self {
        Self::new(ErrorKind::Timeout, "Deadline exceeded").with_source(error)
    }
}

impl From<InvalidHttpRequestError> for ClientError {
    fn from(error: InvalidHttpRequestError) -> Self {
        Self::new(ErrorKind::Validation, error.to_string()).with_source(error)
    }
}

/// Details of a non-success HTTP response.
///
/// Used as the cause of a [`ClientError`] built by
/// [`ClientError::from_status`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("HTTP {code}: {method} {url}")]
pub struct HttpStatusError {
    /// The HTTP status code.
    pub code: u16,
    /// The request method.
    pub method: String,
    /// The full request URL.
    pub url: String,
    /// The beginning of the response body.
    pub body: String,
    /// Selected response headers (see [`RECORDED_HEADERS`]), lowercased.
    pub headers: BTreeMap<String, String>,
}

impl HttpStatusError {
    /// Returns the `X-Request-Id` header, if the server sent one.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.headers.get("x-request-id").map(String::as_str)
    }
}

/// Truncates `body` to at most [`BODY_EXCERPT_LEN`] characters.
pub(crate) fn body_excerpt(body: &str) -> String {
    match body.char_indices().nth(BODY_EXCERPT_LEN) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

/// Error returned when an HTTP request fails validation.
///
/// This error is raised before a request is sent if it fails validation
/// checks, such as:
/// - Missing body for POST/PUT/PATCH requests
/// - Body provided without `body_type`
///
/// # Example
///
/// ```rust
/// use firefly_client::InvalidHttpRequestError;
///
/// let error = InvalidHttpRequestError::MissingBody {
///     method: "POST".to_string(),
/// };
///
/// assert_eq!(error.to_string(), "Cannot use POST without specifying data.");
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A request body was provided without specifying the body type.
    #[error("Cannot set a body without also setting body_type.")]
    MissingBodyType,

    /// A POST, PUT, or PATCH request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },
}

// Verify error types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientError>();
    assert_send_sync::<HttpStatusError>();
};
