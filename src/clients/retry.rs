//! Exponential backoff retry with jitter.
//!
//! [`RetryConfig`] decides *whether* and *when* to retry; [`RetryEngine`]
//! owns the redo loop around an async operation.
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::Duration;
//! use firefly_client::{ClientError, ErrorKind, RetryConfig, RetryEngine};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = RetryEngine::new(RetryConfig {
//!     initial_delay: Duration::from_millis(1),
//!     ..RetryConfig::default()
//! })
//! .unwrap();
//! let calls = AtomicU32::new(0);
//!
//! let result = engine
//!     .run(&CancellationToken::new(), || async {
//!         if calls.fetch_add(1, Ordering::SeqCst) == 0 {
//!             Err(ClientError::new(ErrorKind::Network, "connection reset"))
//!         } else {
//!             Ok("done")
//!         }
//!     })
//!     .await;
//!
//! assert_eq!(result.unwrap(), "done");
//! assert_eq!(calls.load(Ordering::SeqCst), 2);
//! # }
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::clients::errors::{ClientError, ErrorKind};
use crate::error::ConfigError;

/// Symmetric jitter applied to every backoff delay (±10%).
pub const JITTER_FACTOR: f64 = 0.1;

/// Retry policy.
///
/// # Defaults
///
/// - `max_retries`: 3
/// - `initial_delay`: 1 second
/// - `max_delay`: 30 seconds
/// - `backoff_factor`: 2.0
/// - `retryable_kinds`: network, timeout, server, rate limit
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry, before jitter.
    pub initial_delay: Duration,
    /// Upper bound on the delay before jitter.
    pub max_delay: Duration,
    /// Multiplier applied per attempt. Must be at least 1.0.
    pub backoff_factor: f64,
    /// Kinds that may be retried.
    pub retryable_kinds: HashSet<ErrorKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            retryable_kinds: HashSet::from([
                ErrorKind::Network,
                ErrorKind::Timeout,
                ErrorKind::Server,
                ErrorKind::RateLimit,
            ]),
        }
    }
}

impl RetryConfig {
    /// Checks that the backoff factor is a finite value of at least 1.0 and
    /// that `max_delay` leaves room for upward jitter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBackoffFactor`] or
    /// [`ConfigError::InvalidMaxDelay`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(ConfigError::InvalidBackoffFactor {
                value: self.backoff_factor,
            });
        }
        let ceiling = self.max_delay.as_secs_f64() * (1.0 + JITTER_FACTOR);
        if Duration::try_from_secs_f64(ceiling).is_err() {
            return Err(ConfigError::InvalidMaxDelay {
                max_delay: self.max_delay,
            });
        }
        Ok(())
    }

    /// Returns `min(initial_delay * backoff_factor^attempt, max_delay)`.
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let max = self.max_delay.as_secs_f64();
        if secs.is_nan() || secs >= max {
            self.max_delay
        } else {
            Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(self.max_delay)
        }
    }

    /// Returns the delay to wait after failed attempt number `attempt`
    /// (zero-based), with ±10% jitter applied.
    ///
    /// The result always lies in `[0, max_delay * 1.1]`.
    #[must_use]
    pub fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.base_delay(attempt);
        let base = base_delay.as_secs_f64();
        let range = base * JITTER_FACTOR;
        if range <= 0.0 || !range.is_finite() {
            return base_delay;
        }

        let offset = rand::thread_rng().gen_range(-range..=range);
        Duration::try_from_secs_f64((base + offset).max(0.0)).unwrap_or(base_delay)
    }

    /// Returns `true` if errors of `kind` may be retried.
    ///
    /// Cancellation is never retried.
    #[must_use]
    pub fn is_retryable_kind(&self, kind: ErrorKind) -> bool {
        kind != ErrorKind::Cancelled && self.retryable_kinds.contains(&kind)
    }

    /// Returns `true` if `error` may be retried.
    #[must_use]
    pub fn is_retryable_error(&self, error: &ClientError) -> bool {
        self.is_retryable_kind(error.kind())
    }
}

/// Runs an operation, retrying classified failures according to a
/// [`RetryConfig`].
///
/// The operation is invoked at most `max_retries + 1` times. Non-retryable
/// failures are returned after a single invocation.
#[derive(Clone, Debug, Default)]
pub struct RetryEngine {
    config: RetryConfig,
}

impl RetryEngine {
    /// Creates an engine with the given policy.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] from [`RetryConfig::validate`].
    pub fn new(config: RetryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Invokes `operation` until it succeeds, fails with a non-retryable
    /// error, or the retry budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the last failure of `operation`, or
    /// [`ErrorKind::Cancelled`] if `cancel` fires before an attempt or
    /// during a backoff wait.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::cancelled());
            }

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= self.config.max_retries || !self.config.is_retryable_error(&error) {
                return Err(error);
            }

            let delay = self.config.calculate_backoff_delay(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                delay = ?delay,
                kind = %error.kind(),
                "Retrying after failure: {}",
                error
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ClientError::cancelled()),
                () = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
