//! Webhook error types.
//!
//! - [`WebhookError::PayloadParse`]: the body is not a valid event; no
//!   handler ran
//! - [`WebhookError::HandlerFailures`]: one or more handlers failed; every
//!   handler still ran
//! - [`WebhookError::InvalidSignature`]: the `Signature` header is missing or
//!   does not match the body
//!
//! Each variant maps onto an [`ErrorKind`] through [`WebhookError::kind`].

use std::fmt;

use thiserror::Error;

use crate::clients::{ClientError, ErrorKind};

/// A single handler that did not complete successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Zero-based registration index of the handler for its event type.
    pub index: usize,
    /// What went wrong: the handler's error, a panic message, or a timeout.
    pub message: String,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler #{}: {}", self.index, self.message)
    }
}

/// Error type for webhook dispatch and verification.
///
/// # Example
///
/// ```rust
/// use firefly_client::webhooks::{HandlerFailure, WebhookError};
/// use firefly_client::ErrorKind;
///
/// let error = WebhookError::HandlerFailures {
///     event_type: "STORE_TRANSACTION".to_string(),
///     failures: vec![HandlerFailure { index: 1, message: "db down".to_string() }],
/// };
/// assert_eq!(error.kind(), ErrorKind::Server);
/// assert!(error.to_string().contains("handler #1: db down"));
/// ```
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The payload is not a valid webhook event.
    #[error("Failed to parse webhook payload: {0}")]
    PayloadParse(#[from] serde_json::Error),

    /// One or more handlers failed.
    #[error(
        "{} of the handlers for '{event_type}' failed: {}",
        failures.len(),
        failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    HandlerFailures {
        /// The event type that was dispatched.
        event_type: String,
        /// The failed handlers, ordered by registration index.
        failures: Vec<HandlerFailure>,
    },

    /// The request signature is missing or invalid.
    #[error("Invalid webhook signature: {reason}")]
    InvalidSignature {
        /// Why verification failed.
        reason: &'static str,
    },
}

impl WebhookError {
    /// Returns the classified kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PayloadParse(_) => ErrorKind::Parse,
            Self::HandlerFailures { .. } => ErrorKind::Server,
            Self::InvalidSignature { .. } => ErrorKind::Auth,
        }
    }
}

impl From<WebhookError> for ClientError {
    fn from(error: WebhookError) -> Self {
        Self::new(error.kind(), error.to_string()).with_source(error)
    }
}

// Verify WebhookError is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<WebhookError>();
};
