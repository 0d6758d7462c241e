//! Configuration error types for the Firefly III client.
//!
//! All configuration constructors return `Result<T, ConfigError>` to enable
//! fail-fast validation. Error messages are designed to be clear and actionable.
//!
//! # Example
//!
//! ```rust
//! use firefly_client::{BaseUrl, ConfigError};
//!
//! let result = BaseUrl::new("not a url");
//! assert!(matches!(result, Err(ConfigError::InvalidBaseUrl { .. })));
//! ```

use thiserror::Error;

/// Errors that can occur while building client configuration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Base URL is invalid.
    #[error("Invalid base URL '{url}'. Please provide a URL with scheme (e.g., 'https://firefly.example.com').")]
    InvalidBaseUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// Access token cannot be empty.
    #[error("Access token cannot be empty. Please provide a personal access token or omit it.")]
    EmptyAccessToken,

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// Rate limit must allow at least one request.
    #[error("Invalid rate limit {value}. Expected a positive, finite request rate.")]
    InvalidRateLimit {
        /// The rejected rate.
        value: f64,
    },

    /// Burst capacity must be at least one token.
    #[error("Invalid burst size 0. The token bucket must hold at least one token.")]
    InvalidBurst,

    /// Backoff factor must not shrink delays.
    #[error("Invalid backoff factor {value}. Expected a finite value >= 1.0.")]
    InvalidBackoffFactor {
        /// The rejected factor.
        value: f64,
    },

    /// Maximum retry delay leaves no room for jitter.
    #[error("Invalid maximum retry delay {max_delay:?}. The delay plus 10% jitter must fit in a Duration.")]
    InvalidMaxDelay {
        /// The rejected delay.
        max_delay: std::time::Duration,
    },

    /// The underlying HTTP transport could not be created.
    #[error("Failed to create HTTP transport: {reason}")]
    Transport {
        /// Why the transport could not be built.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_base_url_error_message() {
        let error = ConfigError::InvalidBaseUrl {
            url: "ftp//nope".to_string(),
        };
        let message = error.to_string();
        assert!(message.contains("ftp//nope"));
        assert!(message.contains("scheme"));
    }

    #[test]
    fn test_missing_required_field_error_message() {
        let error = ConfigError::MissingRequiredField { field: "base_url" };
        let message = error.to_string();
        assert!(message.contains("base_url"));
        assert!(message.contains("must be set"));
    }

    #[test]
    fn test_invalid_rate_limit_mentions_value() {
        let error = ConfigError::InvalidRateLimit { value: 0.0 };
        assert!(error.to_string().contains("positive, finite"));
    }

    #[test]
    fn test_error_implements_std_error() {
        let error = ConfigError::EmptyAccessToken;
        let _: &dyn std::error::Error = &error;
    }
}
