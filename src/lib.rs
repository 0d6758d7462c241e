//! # Firefly III Rust Client
//!
//! A resilient client for the Firefly III personal finance API: validated
//! configuration, an interceptor chain around every request, token-bucket
//! rate limiting, retries with exponential backoff, OAuth2 grant flows, and
//! webhook dispatch.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ClientConfig`] and [`ClientConfigBuilder`]
//! - An async [`HttpClient`] running each attempt through a [`MiddlewareChain`]
//! - A token-bucket [`RateLimiter`] shared by a client's requests
//! - A [`RetryEngine`] that classifies failures and backs off with jitter
//! - Client credentials, authorization code, and refresh token grants via
//!   [`OAuth2Manager`]
//! - Concurrent webhook handlers via [`webhooks::WebhookManager`] and an
//!   axum ingress via [`webhooks::WebhookServer`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use firefly_client::{AccessToken, BaseUrl, ClientConfig, HttpClient};
//!
//! let config = ClientConfig::builder()
//!     .base_url(BaseUrl::new("https://firefly.example.com").unwrap())
//!     .token(AccessToken::new("personal-access-token").unwrap())
//!     .rate_limit(120)
//!     .retry(3, Duration::from_millis(500))
//!     .build()
//!     .unwrap();
//!
//! let client = HttpClient::new(config).unwrap();
//! client.enable_default_middleware();
//! assert_eq!(client.middleware().len(), 2);
//! ```
//!
//! ## Making API Requests
//!
//! Every request takes a [`CancellationToken`](tokio_util::sync::CancellationToken).
//! Cancelling it stops rate-limit waits, retry waits, and in-flight sends.
//!
//! ```rust,ignore
//! use firefly_client::{ErrorKind, HttpMethod, HttpRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let request = HttpRequest::builder(HttpMethod::Get, "api/v1/accounts")
//!     .query_param("type", "asset")
//!     .build()?;
//!
//! match client.request(&cancel, request).await.and_then(|r| r.error_for_status()) {
//!     Ok(response) => println!("{}", response.body),
//!     Err(e) if e.kind() == ErrorKind::NotFound => println!("no accounts"),
//!     Err(e) => eprintln!("{e} ({})", e.help().unwrap_or_default()),
//! }
//! ```
//!
//! ## OAuth2
//!
//! ```rust,ignore
//! use firefly_client::OAuth2Config;
//!
//! let oauth = OAuth2Config::new("client-id", "client-secret")
//!     .with_token_url("https://firefly.example.com/oauth/token");
//! // ClientConfig::builder().oauth2(oauth) ...
//!
//! let token = client.oauth2().client_credentials_token(&cancel).await?;
//! client.set_access_token(&token);
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: Constructors return `Result` instead of panicking
//! - **Thread-safe**: All types are `Send + Sync`
//! - **Explicit cancellation**: Every suspension point observes a cancellation token
//! - **Classified errors**: Every failure carries exactly one [`ErrorKind`]

pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod webhooks;

mod guarded;

// Re-export public types at crate root for convenience
pub use config::{
    AccessToken, BaseUrl, ClientConfig, ClientConfigBuilder, ClientSecret, OAuth2Config,
};
pub use error::ConfigError;

// Re-export HTTP client types
pub use clients::{
    BoxError, ChainSnapshot, ClientError, DataType, ErrorKind, HttpClient, HttpMethod,
    HttpRequest, HttpRequestBuilder, HttpResponse, HttpStatusError, InvalidHttpRequestError,
    LoggingMiddleware, Middleware, MiddlewareChain, PaginationInfo, RateLimitInfo,
    RateLimitMiddleware, RateLimiter, RetryConfig, RetryEngine, RetryMiddleware,
};

// Re-export OAuth types for convenience
pub use auth::oauth::{AuthorizationRequest, OAuth2Error, OAuth2Manager, OAuth2Token};
