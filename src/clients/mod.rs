//! HTTP transport and resilience for the Firefly III API.
//!
//! # Overview
//!
//! - [`HttpClient`]: sends [`HttpRequest`]s and returns [`HttpResponse`]s
//! - [`MiddlewareChain`]: ordered [`Middleware`] run around every attempt
//! - [`RateLimiter`]: token bucket shared by a client's requests
//! - [`RetryEngine`]: exponential backoff driven by [`RetryConfig`]
//! - [`ClientError`]: every failure, tagged with one [`ErrorKind`]
//!
//! # Request Flow
//!
//! ```text
//! request ─► RetryEngine ─► chain (front to back) ─► transport
//!                ▲                                       │
//!                └──── retryable error ◄── chain (back to front)
//! ```

mod errors;
mod http_client;
mod http_request;
mod http_response;
mod middleware;
mod rate_limiter;
mod retry;

pub use errors::{
    BoxError, ClientError, ErrorKind, HttpStatusError, InvalidHttpRequestError,
};
pub use http_client::{HttpClient, SDK_VERSION};
pub use http_request::{DataType, HttpMethod, HttpRequest, HttpRequestBuilder};
pub use http_response::{HttpResponse, PaginationInfo, RateLimitInfo};
pub use middleware::{
    ChainSnapshot, LoggingMiddleware, Middleware, MiddlewareChain, RateLimitMiddleware,
    RetryMiddleware,
};
pub use rate_limiter::{RateLimiter, DEFAULT_BURST};
pub use retry::{RetryConfig, RetryEngine, JITTER_FACTOR};
