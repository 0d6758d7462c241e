//! HTTP client for Firefly III API communication.
//!
//! This module provides the [`HttpClient`] type, which sends requests
//! through the middleware chain and the retry engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio_util::sync::CancellationToken;

use crate::auth::oauth::{OAuth2Manager, OAuth2Token};
use crate::clients::errors::ClientError;
use crate::clients::http_request::HttpRequest;
use crate::clients::http_response::HttpResponse;
use crate::clients::middleware::{
    ChainSnapshot, LoggingMiddleware, Middleware, MiddlewareChain, RateLimitMiddleware,
    RetryMiddleware,
};
use crate::clients::rate_limiter::RateLimiter;
use crate::clients::retry::RetryEngine;
use crate::config::ClientConfig;
use crate::error::ConfigError;
use crate::webhooks::WebhookManager;

/// Client library version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP client for making requests to the Firefly III API.
///
/// The client handles:
/// - URL construction from the configured base URL
/// - Default headers including `Accept`, `User-Agent`, and `Authorization`
/// - The middleware chain around every attempt
/// - Retries with exponential backoff for retryable failures
///
/// The middleware chain starts empty; call
/// [`enable_default_middleware`](Self::enable_default_middleware) to install
/// rate limiting, logging (in debug mode), and retry signaling.
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`, making it safe to share across async tasks.
///
/// # Example
///
/// ```rust,no_run
/// use firefly_client::{BaseUrl, ClientConfig, HttpClient, HttpMethod, HttpRequest};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::builder()
///     .base_url(BaseUrl::new("https://firefly.example.com")?)
///     .build()?;
/// let client = HttpClient::new(config)?;
/// client.enable_default_middleware();
///
/// let request = HttpRequest::builder(HttpMethod::Get, "api/v1/about").build()?;
/// let response = client
///     .request(&CancellationToken::new(), request)
///     .await?
///     .error_for_status()?;
/// println!("{}", response.body);
/// # Ok(())
/// # }
/// ```
pub struct HttpClient {
    client: reqwest::Client,
    config: ClientConfig,
    default_headers: HashMap<String, String>,
    authorization: RwLock<Option<String>>,
    rate_limiter: Arc<RateLimiter>,
    retry: RetryEngine,
    middleware: MiddlewareChain,
    oauth2: OAuth2Manager,
    webhooks: Arc<WebhookManager>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("default_headers", &self.default_headers)
            .field("authorization", &self.authorization().map(|_| "*****"))
            .field("rate_limiter", &self.rate_limiter)
            .field("retry", &self.retry)
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Creates a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the rate limit or retry settings are
    /// invalid, or if the HTTP transport cannot be initialized.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| ConfigError::Transport {
                reason: e.to_string(),
            })?;

        let rate_limiter = Arc::new(RateLimiter::per_minute(config.rate_limit())?);
        let retry = RetryEngine::new(config.retry_config())?;
        let webhooks = match config.webhook_handler_timeout() {
            Some(timeout) => WebhookManager::new().with_handler_timeout(timeout),
            None => WebhookManager::new(),
        };

        let mut default_headers = HashMap::new();
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        if config.debug_mode() {
            default_headers.insert("X-Debug".to_string(), "true".to_string());
        }

        let authorization = config
            .token()
            .map(|token| format!("Bearer {}", token.as_ref()));
        let oauth2 = OAuth2Manager::new(config.oauth2().cloned(), client.clone());

        Ok(Self {
            client,
            default_headers,
            authorization: RwLock::new(authorization),
            rate_limiter,
            retry,
            middleware: MiddlewareChain::new(),
            oauth2,
            webhooks: Arc::new(webhooks),
            config,
        })
    }

    /// Returns the configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Returns the default headers sent with every request.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns the rate limiter shared by this client's requests.
    #[must_use]
    pub fn rate_limiter(&self) -> Arc<RateLimiter> {
        Arc::clone(&self.rate_limiter)
    }

    /// Returns the retry engine.
    #[must_use]
    pub const fn retry_engine(&self) -> &RetryEngine {
        &self.retry
    }

    /// Returns the middleware chain.
    #[must_use]
    pub const fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// Returns the OAuth2 manager.
    #[must_use]
    pub const fn oauth2(&self) -> &OAuth2Manager {
        &self.oauth2
    }

    /// Returns the webhook manager.
    #[must_use]
    pub fn webhooks(&self) -> Arc<WebhookManager> {
        Arc::clone(&self.webhooks)
    }

    /// Appends a middleware to the chain.
    pub fn add_middleware(&self, middleware: Arc<dyn Middleware>) {
        self.middleware.add(middleware);
    }

    /// Installs the standard middleware: rate limiting, then logging when
    /// debug mode is on, then retry signaling when retries are enabled.
    pub fn enable_default_middleware(&self) {
        self.add_middleware(Arc::new(RateLimitMiddleware::new(self.rate_limiter())));
        if self.config.debug_mode() {
            self.add_middleware(Arc::new(LoggingMiddleware::with_base_url(
                self.config.base_url().clone(),
            )));
        }
        if self.config.retry_count() > 0 {
            self.add_middleware(Arc::new(RetryMiddleware::new(self.retry.config().clone())));
        }
    }

    /// Uses `token` to authorize subsequent requests.
    pub fn set_access_token(&self, token: &OAuth2Token) {
        let mut guard = self
            .authorization
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Some(token.authorization_header());
    }

    fn authorization(&self) -> Option<String> {
        self.authorization
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sends an HTTP request to the Firefly III API.
    ///
    /// Each attempt runs the request through the middleware chain, sends it,
    /// and runs the response back through the chain in reverse. Attempts
    /// that fail with a retryable error are repeated with backoff.
    ///
    /// Responses with a failure status that no middleware turned into an
    /// error are returned as `Ok`; use
    /// [`HttpResponse::error_for_status`] to classify them.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if:
    /// - the request is invalid (kind `validation`)
    /// - a middleware rejects the request or response
    /// - the transport fails (kind `network` or `timeout`)
    /// - `cancel` fires (kind `cancelled`)
    pub async fn request(
        &self,
        cancel: &CancellationToken,
        request: HttpRequest,
    ) -> Result<HttpResponse, ClientError> {
        request.verify()?;

        let chain = self.middleware.snapshot();
        self.retry
            .run(cancel, || self.execute_once(&chain, cancel, request.clone()))
            .await
    }

    async fn execute_once(
        &self,
        chain: &ChainSnapshot,
        cancel: &CancellationToken,
        request: HttpRequest,
    ) -> Result<HttpResponse, ClientError> {
        let request = chain.process_request(cancel, request).await?;
        request.verify()?;

        if cancel.is_cancelled() {
            return Err(ClientError::cancelled());
        }

        let url = self.config.base_url().join(&request.path);
        let mut builder = self.client.request(request.http_method.as_reqwest(), &url);

        for (key, value) in &self.default_headers {
            builder = builder.header(key, value);
        }
        if let Some(authorization) = self.authorization() {
            builder = builder.header(AUTHORIZATION, authorization);
        }
        if let Some(body_type) = &request.body_type {
            builder = builder.header(CONTENT_TYPE, body_type.as_content_type());
        }
        if let Some(extra) = &request.extra_headers {
            for (key, value) in extra {
                builder = builder.header(key, value);
            }
        }
        if let Some(query) = &request.query {
            builder = builder.query(query);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::cancelled()),
            result = builder.send() => result.map_err(ClientError::from_transport)?,
        };

        let code = response.status().as_u16();
        let response_url = response.url().to_string();
        let headers = Self::parse_response_headers(response.headers());

        let text = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ClientError::cancelled()),
            result = response.text() => result.map_err(ClientError::from_transport)?,
        };

        let response = HttpResponse::new(
            request.http_method,
            response_url,
            code,
            headers,
            Self::parse_body(text),
        );
        chain.process_response(cancel, response).await
    }

    /// Parses response headers into a `HashMap` keyed by lowercase name.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }

    /// Parses the body as JSON, keeping non-JSON text as a string value.
    fn parse_body(text: String) -> serde_json::Value {
        if text.trim().is_empty() {
            return serde_json::json!({});
        }
        serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
    }
}
