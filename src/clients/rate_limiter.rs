//! Client-side token bucket rate limiting.
//!
//! A [`RateLimiter`] is shared through `Arc` by every outbound call of one
//! client. Tokens refill continuously; each call consumes one token and waits
//! when none is available.
//!
//! # Example
//!
//! ```rust
//! use firefly_client::RateLimiter;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let limiter = RateLimiter::per_minute(60).unwrap();
//! let cancel = CancellationToken::new();
//!
//! // The bucket starts full, so the first acquire returns immediately.
//! limiter.acquire(&cancel).await.unwrap();
//! # }
//! ```

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::clients::errors::ClientError;
use crate::error::ConfigError;

/// Default bucket capacity.
pub const DEFAULT_BURST: u32 = 1;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn refill(&mut self, now: Instant, rate: f64, capacity: f64) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = elapsed.mul_add(rate, self.tokens).min(capacity);
        self.last_refill = now;
    }
}

/// A token bucket rate limiter.
///
/// # Thread Safety
///
/// `RateLimiter` is `Send + Sync`. The bucket lock is never held across an
/// await point.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    bucket: Mutex<TokenBucket>,
}

// Verify RateLimiter is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RateLimiter>();
};

impl RateLimiter {
    /// Creates a limiter refilling `rate_per_second` tokens per second with
    /// room for `burst` tokens. The bucket starts full.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRateLimit`] if the rate is not a positive
    /// finite number, or [`ConfigError::InvalidBurst`] if `burst` is zero.
    pub fn new(rate_per_second: f64, burst: u32) -> Result<Self, ConfigError> {
        if !rate_per_second.is_finite() || rate_per_second <= 0.0 {
            return Err(ConfigError::InvalidRateLimit {
                value: rate_per_second,
            });
        }
        if burst == 0 {
            return Err(ConfigError::InvalidBurst);
        }

        let capacity = f64::from(burst);
        Ok(Self {
            rate: rate_per_second,
            capacity,
            bucket: Mutex::new(TokenBucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        })
    }

    /// Creates a limiter allowing `requests_per_minute` with a burst of one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRateLimit`] if `requests_per_minute` is zero.
    pub fn per_minute(requests_per_minute: u32) -> Result<Self, ConfigError> {
        Self::new(f64::from(requests_per_minute) / 60.0, DEFAULT_BURST)
    }

    /// Returns the refill rate in tokens per second.
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.rate
    }

    /// Returns the bucket capacity.
    #[must_use]
    pub const fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Takes a token if one is available, without waiting.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.take_or_wait_time().is_none()
    }

    /// Waits for a token and consumes it.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Cancelled`](crate::ErrorKind::Cancelled) if
    /// `cancel` fires before a token is available. No token is consumed in
    /// that case.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ClientError::cancelled());
            }

            let Some(wait) = self.take_or_wait_time() else {
                return Ok(());
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ClientError::cancelled()),
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up after `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Timeout`](crate::ErrorKind::Timeout) if the
    /// deadline passes first, or
    /// [`ErrorKind::Cancelled`](crate::ErrorKind::Cancelled) on cancellation.
    pub async fn acquire_with_timeout(
        &self,
        cancel: &CancellationToken,
        deadline: Duration,
    ) -> Result<(), ClientError> {
        tokio::time::timeout(deadline, self.acquire(cancel))
            .await
            .map_err(ClientError::deadline_elapsed)?
    }

    /// Refills the bucket, then either consumes a token (`None`) or reports
    /// how long until the next token is due.
    fn take_or_wait_time(&self) -> Option<Duration> {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.refill(Instant::now(), self.rate, self.capacity);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            None
        } else {
            let missing = 1.0 - bucket.tokens;
            Some(Duration::from_secs_f64(missing / self.rate))
        }
    }
}
