//! HTTP response types for the Firefly III client.
//!
//! This module provides the [`HttpResponse`] type and the header and body
//! metadata parsed from it.

use std::collections::{BTreeMap, HashMap};

use crate::clients::errors::{body_excerpt, ClientError, HttpStatusError, RECORDED_HEADERS};
use crate::clients::http_request::HttpMethod;

/// Rate limit state reported by the server in `X-RateLimit-*` headers.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use firefly_client::RateLimitInfo;
///
/// let headers = HashMap::from([
///     ("x-ratelimit-limit".to_string(), vec!["60".to_string()]),
///     ("x-ratelimit-remaining".to_string(), vec!["12".to_string()]),
/// ]);
///
/// let info = RateLimitInfo::from_headers(&headers).unwrap();
/// assert_eq!(info.limit, Some(60));
/// assert_eq!(info.remaining, Some(12));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Requests allowed in the current window.
    pub limit: Option<u32>,
    /// Requests left in the current window.
    pub remaining: Option<u32>,
}

impl RateLimitInfo {
    /// Parses the rate limit headers. Returns `None` if neither is present.
    #[must_use]
    pub fn from_headers(headers: &HashMap<String, Vec<String>>) -> Option<Self> {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|values| values.first())
                .and_then(|value| value.trim().parse::<u32>().ok())
        };

        let info = Self {
            limit: parse("x-ratelimit-limit"),
            remaining: parse("x-ratelimit-remaining"),
        };

        (info.limit.is_some() || info.remaining.is_some()).then_some(info)
    }
}

/// Pagination metadata from the `meta.pagination` object of a list response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaginationInfo {
    /// Total number of items across all pages.
    pub total: u64,
    /// Number of items on this page.
    pub count: u64,
    /// Page size.
    pub per_page: u64,
    /// One-based index of this page.
    pub current_page: u64,
    /// Number of pages.
    pub total_pages: u64,
}

impl PaginationInfo {
    /// Extracts pagination metadata from a response body.
    #[must_use]
    pub fn from_body(body: &serde_json::Value) -> Option<Self> {
        let pagination = body.get("meta")?.get("pagination")?;
        let field = |name: &str| pagination.get(name).and_then(serde_json::Value::as_u64);

        Some(Self {
            total: field("total")?,
            count: field("count").unwrap_or(0),
            per_page: field("per_page").unwrap_or(0),
            current_page: field("current_page")?,
            total_pages: field("total_pages")?,
        })
    }

    /// Returns `true` if there is a page after this one.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// An HTTP response from the Firefly III API.
///
/// The client returns non-success responses as `Ok` unless a middleware
/// turns them into errors; call [`error_for_status`](Self::error_for_status)
/// to classify them.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The method of the request that produced this response.
    pub method: HttpMethod,
    /// The full URL of the request that produced this response.
    pub url: String,
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, lowercased (headers may have multiple values).
    pub headers: HashMap<String, Vec<String>>,
    /// The parsed response body. Non-JSON bodies are kept as a JSON string.
    pub body: serde_json::Value,
    /// Seconds to wait before retrying (from `Retry-After` header).
    pub retry_after: Option<f64>,
    /// Server-side rate limit state.
    pub rate_limit: Option<RateLimitInfo>,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`, parsing `Retry-After` and the
    /// `X-RateLimit-*` headers.
    #[must_use]
    pub fn new(
        method: HttpMethod,
        url: impl Into<String>,
        code: u16,
        headers: HashMap<String, Vec<String>>,
        body: serde_json::Value,
    ) -> Self {
        let retry_after = headers
            .get("retry-after")
            .and_then(|values| values.first())
            .and_then(|value| value.trim().parse::<f64>().ok());
        let rate_limit = RateLimitInfo::from_headers(&headers);

        Self {
            method,
            url: url.into(),
            code,
            headers,
            body,
            retry_after,
            rate_limit,
        }
    }

    /// Returns `true` if the response status code is in the 2xx range.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the canonical reason phrase for the status code, if known.
    #[must_use]
    pub fn reason(&self) -> Option<&'static str> {
        reqwest::StatusCode::from_u16(self.code)
            .ok()
            .and_then(|status| status.canonical_reason())
    }

    /// Returns the first value of a header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the `X-Request-Id` header value, if present.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.header("x-request-id")
    }

    /// Returns pagination metadata from the body, if this is a list response.
    #[must_use]
    pub fn pagination(&self) -> Option<PaginationInfo> {
        PaginationInfo::from_body(&self.body)
    }

    /// Describes this response as an [`HttpStatusError`].
    #[must_use]
    pub fn status_error(&self) -> HttpStatusError {
        let body = match &self.body {
            serde_json::Value::String(text) => body_excerpt(text),
            other => body_excerpt(&other.to_string()),
        };
        let headers: BTreeMap<String, String> = RECORDED_HEADERS
            .iter()
            .filter_map(|name| self.header(name).map(|v| ((*name).to_string(), v.to_string())))
            .collect();

        HttpStatusError {
            code: self.code,
            method: self.method.to_string(),
            url: self.url.clone(),
            body,
            headers,
        }
    }

    /// Returns `self` for success statuses, or a classified error otherwise.
    ///
    /// Statuses below 400 (such as redirects) are passed through.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] whose kind is derived from the status code.
    pub fn error_for_status(self) -> Result<Self, ClientError> {
        if self.code >= 400 {
            return Err(ClientError::from_status(self.status_error()));
        }
        Ok(self)
    }
}
