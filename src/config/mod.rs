//! Configuration types for the Firefly III client.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`ClientConfig`]: Connection, resilience, and authentication settings
//! - [`ClientConfigBuilder`]: A builder for constructing [`ClientConfig`] instances
//! - [`OAuth2Config`]: OAuth2 client credentials and endpoints
//! - [`BaseUrl`]: A validated Firefly III base URL
//! - [`AccessToken`]: A personal access token with masked debug output
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use firefly_client::{ClientConfig, BaseUrl, AccessToken};
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://firefly.example.com").unwrap())
//!     .token(AccessToken::new("personal-access-token").unwrap())
//!     .timeout(Duration::from_secs(60))
//!     .retry(5, Duration::from_secs(2))
//!     .rate_limit(100)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.rate_limit(), 100);
//! ```

mod newtypes;
mod oauth2;

pub use newtypes::{AccessToken, BaseUrl, ClientSecret};
pub use oauth2::OAuth2Config;

use std::time::Duration;

use crate::clients::RetryConfig;
use crate::error::ConfigError;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default initial retry delay.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default rate limit in requests per minute.
pub const DEFAULT_RATE_LIMIT: u32 = 60;

/// Configuration for a Firefly III client.
///
/// # Thread Safety
///
/// `ClientConfig` is `Clone`, `Send`, and `Sync`.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: BaseUrl,
    token: Option<AccessToken>,
    timeout: Duration,
    retry_count: u32,
    retry_delay: Duration,
    rate_limit: u32,
    oauth2: Option<OAuth2Config>,
    user_agent: String,
    debug_mode: bool,
    webhook_handler_timeout: Option<Duration>,
}

impl ClientConfig {
    /// Creates a new builder for constructing a `ClientConfig`.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the base URL of the Firefly III instance.
    #[must_use]
    pub const fn base_url(&self) -> &BaseUrl {
        &self.base_url
    }

    /// Returns the personal access token, if configured.
    #[must_use]
    pub const fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the number of retries after the first attempt.
    #[must_use]
    pub const fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the initial retry delay.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns the rate limit in requests per minute.
    #[must_use]
    pub const fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    /// Returns the OAuth2 configuration, if any.
    #[must_use]
    pub const fn oauth2(&self) -> Option<&OAuth2Config> {
        self.oauth2.as_ref()
    }

    /// Returns the `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Returns whether debug mode is enabled.
    ///
    /// Debug mode adds an `X-Debug: true` header to every request and
    /// installs the logging middleware in
    /// [`HttpClient::enable_default_middleware`](crate::HttpClient::enable_default_middleware).
    #[must_use]
    pub const fn debug_mode(&self) -> bool {
        self.debug_mode
    }

    /// Returns the per-handler timeout of the client's webhook manager, if set.
    #[must_use]
    pub const fn webhook_handler_timeout(&self) -> Option<Duration> {
        self.webhook_handler_timeout
    }

    /// Builds the retry configuration implied by `retry_count` and `retry_delay`.
    ///
    /// Maximum delay, backoff factor, and retryable kinds keep their defaults.
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.retry_count,
            initial_delay: self.retry_delay,
            ..RetryConfig::default()
        }
    }
}

// Verify ClientConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClientConfig>();
};

/// Builder for constructing [`ClientConfig`] instances.
///
/// `base_url` is required. All other fields have defaults:
///
/// - `timeout`: 30 seconds
/// - `retry`: 3 retries, 1 second initial delay
/// - `rate_limit`: 60 requests per minute
/// - `user_agent`: `firefly-client-rust/<version>`
/// - `debug_mode`: `false`
/// - `webhook_handler_timeout`: none (handlers run unbounded)
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<BaseUrl>,
    token: Option<AccessToken>,
    timeout: Option<Duration>,
    retry_count: Option<u32>,
    retry_delay: Option<Duration>,
    rate_limit: Option<u32>,
    oauth2: Option<OAuth2Config>,
    user_agent: Option<String>,
    debug_mode: bool,
    webhook_handler_timeout: Option<Duration>,
}

impl ClientConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL (required).
    #[must_use]
    pub fn base_url(mut self, url: BaseUrl) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Sets the personal access token sent as a bearer token.
    #[must_use]
    pub fn token(mut self, token: AccessToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Configures retry behavior.
    #[must_use]
    pub const fn retry(mut self, count: u32, delay: Duration) -> Self {
        self.retry_count = Some(count);
        self.retry_delay = Some(delay);
        self
    }

    /// Sets the rate limit in requests per minute.
    #[must_use]
    pub const fn rate_limit(mut self, requests_per_minute: u32) -> Self {
        self.rate_limit = Some(requests_per_minute);
        self
    }

    /// Attaches an OAuth2 configuration.
    #[must_use]
    pub fn oauth2(mut self, oauth2: OAuth2Config) -> Self {
        self.oauth2 = Some(oauth2);
        self
    }

    /// Overrides the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Enables or disables debug mode.
    #[must_use]
    pub const fn debug_mode(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }

    /// Bounds each webhook handler run by the client's webhook manager.
    #[must_use]
    pub const fn webhook_handler_timeout(mut self, timeout: Duration) -> Self {
        self.webhook_handler_timeout = Some(timeout);
        self
    }

    /// Builds the [`ClientConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `base_url` is not set,
    /// or [`ConfigError::InvalidRateLimit`] if the rate limit is zero.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let base_url = self
            .base_url
            .ok_or(ConfigError::MissingRequiredField { field: "base_url" })?;

        let rate_limit = self.rate_limit.unwrap_or(DEFAULT_RATE_LIMIT);
        if rate_limit == 0 {
            return Err(ConfigError::InvalidRateLimit { value: 0.0 });
        }

        Ok(ClientConfig {
            base_url,
            token: self.token,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            retry_count: self.retry_count.unwrap_or(DEFAULT_RETRY_COUNT),
            retry_delay: self.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY),
            rate_limit,
            oauth2: self.oauth2,
            user_agent: self.user_agent.unwrap_or_else(|| {
                format!("firefly-client-rust/{}", env!("CARGO_PKG_VERSION"))
            }),
            debug_mode: self.debug_mode,
            webhook_handler_timeout: self.webhook_handler_timeout,
        })
    }
}
