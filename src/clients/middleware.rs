//! Request/response interceptors.
//!
//! A [`MiddlewareChain`] runs every [`Middleware`] over the outgoing request
//! in insertion order and over the incoming response in reverse order. The
//! first error aborts the remaining steps.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use firefly_client::{ClientError, HttpRequest, Middleware, MiddlewareChain};
//! use tokio_util::sync::CancellationToken;
//!
//! struct TraceHeader;
//!
//! #[async_trait]
//! impl Middleware for TraceHeader {
//!     async fn process_request(
//!         &self,
//!         _cancel: &CancellationToken,
//!         mut request: HttpRequest,
//!     ) -> Result<HttpRequest, ClientError> {
//!         request
//!             .extra_headers
//!             .get_or_insert_with(Default::default)
//!             .insert("X-Trace".to_string(), "on".to_string());
//!         Ok(request)
//!     }
//! }
//!
//! let chain = MiddlewareChain::new();
//! chain.add(Arc::new(TraceHeader));
//! assert_eq!(chain.len(), 1);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::clients::errors::ClientError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::rate_limiter::RateLimiter;
use crate::clients::retry::RetryConfig;
use crate::config::BaseUrl;
use crate::guarded::GuardedList;

/// An interceptor around one HTTP call.
///
/// Both hooks default to passing their input through unchanged.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Inspects or rewrites the outgoing request.
    async fn process_request(
        &self,
        _cancel: &CancellationToken,
        request: HttpRequest,
    ) -> Result<HttpRequest, ClientError> {
        Ok(request)
    }

    /// Inspects or rewrites the incoming response.
    async fn process_response(
        &self,
        _cancel: &CancellationToken,
        response: HttpResponse,
    ) -> Result<HttpResponse, ClientError> {
        Ok(response)
    }
}

/// Logs every request and response at `DEBUG` level.
///
/// Requests are logged with their full URL when the middleware knows the
/// base URL, otherwise with the relative path.
#[derive(Clone, Debug, Default)]
pub struct LoggingMiddleware {
    base_url: Option<BaseUrl>,
}

impl LoggingMiddleware {
    /// Creates a middleware that logs relative request paths.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_url: None }
    }

    /// Creates a middleware that resolves request paths against `base_url`.
    #[must_use]
    pub const fn with_base_url(base_url: BaseUrl) -> Self {
        Self {
            base_url: Some(base_url),
        }
    }

    /// Returns the URL logged for `request`.
    #[must_use]
    pub fn request_url(&self, request: &HttpRequest) -> String {
        self.base_url
            .as_ref()
            .map_or_else(|| request.path.clone(), |base| base.join(&request.path))
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn process_request(
        &self,
        _cancel: &CancellationToken,
        request: HttpRequest,
    ) -> Result<HttpRequest, ClientError> {
        tracing::debug!(
            method = %request.http_method,
            url = %self.request_url(&request),
            "HTTP Request"
        );
        Ok(request)
    }

    async fn process_response(
        &self,
        _cancel: &CancellationToken,
        response: HttpResponse,
    ) -> Result<HttpResponse, ClientError> {
        tracing::debug!(
            method = %response.method,
            url = %response.url,
            status = response.code,
            reason = response.reason().unwrap_or(""),
            "HTTP Response"
        );
        Ok(response)
    }
}

/// Waits for a rate limiter token before each request.
#[derive(Clone, Debug)]
pub struct RateLimitMiddleware {
    limiter: Arc<RateLimiter>,
}

impl RateLimitMiddleware {
    /// Creates a middleware drawing from `limiter`.
    #[must_use]
    pub const fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    async fn process_request(
        &self,
        cancel: &CancellationToken,
        request: HttpRequest,
    ) -> Result<HttpRequest, ClientError> {
        self.limiter.acquire(cancel).await?;
        Ok(request)
    }
}

/// Turns retryable failure responses into errors so the retry engine
/// re-drives the call.
///
/// Non-retryable failure responses pass through unchanged.
#[derive(Clone, Debug, Default)]
pub struct RetryMiddleware {
    config: RetryConfig,
}

impl RetryMiddleware {
    /// Creates a middleware using `config` to decide what is retryable.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn process_response(
        &self,
        _cancel: &CancellationToken,
        response: HttpResponse,
    ) -> Result<HttpResponse, ClientError> {
        if response.code >= 400 {
            let kind = ClientError::classify_status(response.code);
            if self.config.is_retryable_kind(kind) {
                return Err(ClientError::from_status(response.status_error()));
            }
        }
        Ok(response)
    }
}

/// An ordered, append-only list of middleware.
///
/// Adding middleware is safe while calls are in flight: each call works on a
/// [`ChainSnapshot`] taken when it starts.
#[derive(Default)]
pub struct MiddlewareChain {
    middlewares: GuardedList<Arc<dyn Middleware>>,
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("len", &self.len())
            .finish()
    }
}

impl MiddlewareChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware to the end of the chain.
    pub fn add(&self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Returns the number of middleware in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns `true` if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Captures the current middleware list for one call.
    #[must_use]
    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            middlewares: self.middlewares.snapshot(),
        }
    }

    /// Runs the request through a fresh snapshot of the chain.
    ///
    /// # Errors
    ///
    /// Returns the first middleware error.
    pub async fn process_request(
        &self,
        cancel: &CancellationToken,
        request: HttpRequest,
    ) -> Result<HttpRequest, ClientError> {
        self.snapshot().process_request(cancel, request).await
    }

    /// Runs the response through a fresh snapshot of the chain.
    ///
    /// # Errors
    ///
    /// Returns the first middleware error.
    pub async fn process_response(
        &self,
        cancel: &CancellationToken,
        response: HttpResponse,
    ) -> Result<HttpResponse, ClientError> {
        self.snapshot().process_response(cancel, response).await
    }
}

/// The middleware list as it was when a call started.
#[derive(Clone)]
pub struct ChainSnapshot {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl ChainSnapshot {
    /// Runs the request through every middleware in insertion order.
    ///
    /// # Errors
    ///
    /// Returns the first middleware error; later middleware are skipped.
    pub async fn process_request(
        &self,
        cancel: &CancellationToken,
        mut request: HttpRequest,
    ) -> Result<HttpRequest, ClientError> {
        for middleware in self.middlewares.iter() {
            request = middleware.process_request(cancel, request).await?;
        }
        Ok(request)
    }

    /// Runs the response through every middleware in reverse order.
    ///
    /// # Errors
    ///
    /// Returns the first middleware error; earlier middleware are skipped.
    pub async fn process_response(
        &self,
        cancel: &CancellationToken,
        mut response: HttpResponse,
    ) -> Result<HttpResponse, ClientError> {
        for middleware in self.middlewares.iter().rev() {
            response = middleware.process_response(cancel, response).await?;
        }
        Ok(response)
    }
}

// Verify chain types are Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<MiddlewareChain>();
    assert_send_sync::<ChainSnapshot>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, HttpMethod};
    use serde_json::json;
    use std::collections::HashMap;

    fn response(code: u16) -> HttpResponse {
        HttpResponse::new(HttpMethod::Get, "https://ff/api/v1/about", code, HashMap::new(), json!({}))
    }

    #[tokio::test]
    async fn test_retry_middleware_signals_retryable_status() {
        let middleware = RetryMiddleware::default();
        let cancel = CancellationToken::new();

        let error = middleware
            .process_response(&cancel, response(503))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Server);
        assert_eq!(error.status(), Some(503));
    }

    #[tokio::test]
    async fn test_retry_middleware_passes_non_retryable_status() {
        let middleware = RetryMiddleware::default();
        let cancel = CancellationToken::new();

        let passed = middleware.process_response(&cancel, response(404)).await.unwrap();
        assert_eq!(passed.code, 404);
        let passed = middleware.process_response(&cancel, response(200)).await.unwrap();
        assert_eq!(passed.code, 200);
    }

    #[tokio::test]
    async fn test_logging_middleware_never_mutates() {
        let cancel = CancellationToken::new();
        let request = HttpRequest::builder(HttpMethod::Get, "api/v1/about").build().unwrap();

        let logging = LoggingMiddleware::new();
        let out = logging.process_request(&cancel, request.clone()).await.unwrap();
        assert_eq!(out, request);
        let out = logging.process_response(&cancel, response(418)).await.unwrap();
        assert_eq!(out.code, 418);
    }

    #[test]
    fn test_logging_middleware_resolves_full_url() {
        let request = HttpRequest::builder(HttpMethod::Get, "/api/v1/accounts").build().unwrap();

        let base = BaseUrl::new("https://ff.example.com/").unwrap();
        assert_eq!(
            LoggingMiddleware::with_base_url(base).request_url(&request),
            "https://ff.example.com/api/v1/accounts"
        );
        assert_eq!(LoggingMiddleware::new().request_url(&request), "/api/v1/accounts");
    }

    #[tokio::test]
    async fn test_rate_limit_middleware_fails_when_cancelled() {
        let limiter = Arc::new(RateLimiter::new(1.0, 1).unwrap());
        let middleware = RateLimitMiddleware::new(Arc::clone(&limiter));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let request = HttpRequest::builder(HttpMethod::Get, "api/v1/about").build().unwrap();
        let error = middleware.process_request(&cancel, request).await.unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert!(limiter.try_acquire());
    }
}
