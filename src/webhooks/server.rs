//! HTTP ingress for webhook deliveries.
//!
//! [`WebhookServer`] exposes a single `POST` route. Each request body is
//! verified (when a secret is configured) and handed to a
//! [`WebhookManager`]:
//!
//! | Outcome | Status |
//! |---|---|
//! | dispatched, every handler succeeded | `200 OK` |
//! | payload is not a valid event | `400 Bad Request` |
//! | signature missing or invalid | `401 Unauthorized` |
//! | method other than `POST` | `405 Method Not Allowed` |
//! | one or more handlers failed | `500 Internal Server Error` |
//! | delivery not answered within the request timeout | `408 Request Timeout` |

use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;

use crate::webhooks::errors::WebhookError;
use crate::webhooks::manager::WebhookManager;
use crate::webhooks::verification::{verify_signature, SIGNATURE_HEADER};

/// Default route the server listens on.
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

/// Default limit for answering one delivery.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default limit for draining in-flight deliveries after shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Serves webhook deliveries to a [`WebhookManager`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use firefly_client::webhooks::{WebhookManager, WebhookServer};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> std::io::Result<()> {
/// let manager = Arc::new(WebhookManager::new());
/// let server = WebhookServer::new(manager).with_secret("shared-secret");
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// let shutdown = CancellationToken::new();
/// server.serve(listener, shutdown).await
/// # }
/// ```
#[derive(Clone)]
pub struct WebhookServer {
    manager: Arc<WebhookManager>,
    secret: Option<String>,
    path: String,
    request_timeout: Duration,
    shutdown_timeout: Duration,
}

struct ServerState {
    manager: Arc<WebhookManager>,
    secret: Option<String>,
}

impl fmt::Debug for WebhookServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookServer")
            .field("path", &self.path)
            .field("secret", &self.secret.as_ref().map(|_| "*****"))
            .field("request_timeout", &self.request_timeout)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}

impl WebhookServer {
    /// Creates a server dispatching to `manager` on [`DEFAULT_WEBHOOK_PATH`]
    /// without signature verification.
    #[must_use]
    pub fn new(manager: Arc<WebhookManager>) -> Self {
        Self {
            manager,
            secret: None,
            path: DEFAULT_WEBHOOK_PATH.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Requires every delivery to carry a valid `Signature` for `secret`.
    ///
    /// An empty secret disables verification.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into()).filter(|s| !s.is_empty());
        self
    }

    /// Sets the route path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets how long one delivery may take before it is answered with
    /// `408 Request Timeout`.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets how long [`serve`](Self::serve) waits for in-flight deliveries
    /// after shutdown.
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Returns the route path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Builds the axum router for this server.
    ///
    /// Useful for mounting the webhook route inside a larger application.
    /// The request timeout is applied as a layer of the returned router.
    #[must_use]
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let state = Arc::new(ServerState {
            manager: Arc::clone(&self.manager),
            secret: self.secret.clone(),
        });
        Router::new()
            .route(&self.path, post(receive_webhook))
            .with_state(state)
            .layer(TimeoutLayer::new(self.request_timeout))
    }

    /// Accepts connections on `listener` until `shutdown` is cancelled.
    ///
    /// After cancellation, in-flight deliveries get up to the shutdown
    /// timeout to finish; deliveries still running then are abandoned.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the listener fails.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, path = %self.path, "Webhook server starting");

        let drain_limit = self.shutdown_timeout;
        let signal = shutdown.clone();
        let server = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { signal.cancelled().await });
        let drain_deadline = async {
            shutdown.cancelled().await;
            tokio::time::sleep(drain_limit).await;
        };

        tokio::select! {
            result = server.into_future() => result?,
            () = drain_deadline => {
                tracing::warn!(timeout = ?drain_limit, "Webhook server drain timed out");
            }
        }

        tracing::info!("Webhook server stopped");
        Ok(())
    }
}

async fn receive_webhook(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(secret) = &state.secret {
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if let Err(e) = verify_signature(header, &body, secret) {
            tracing::warn!(error = %e, "Rejected webhook delivery");
            return (StatusCode::UNAUTHORIZED, "Invalid signature");
        }
    }

    match state.manager.process_webhook(&body).await {
        Ok(()) => (StatusCode::OK, "OK"),
        Err(WebhookError::PayloadParse(_)) => (StatusCode::BAD_REQUEST, "Invalid payload"),
        Err(WebhookError::InvalidSignature { .. }) => (StatusCode::UNAUTHORIZED, "Invalid signature"),
        Err(WebhookError::HandlerFailures { .. }) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Handler failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_secret_disables_verification() {
        let server = WebhookServer::new(Arc::new(WebhookManager::new())).with_secret("");
        assert!(server.secret.is_none());
    }

    #[test]
    fn test_timeouts_default_and_override() {
        let server = WebhookServer::new(Arc::new(WebhookManager::new()));
        assert_eq!(server.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(server.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);

        let server = server
            .with_request_timeout(Duration::from_secs(2))
            .with_shutdown_timeout(Duration::from_millis(500));
        assert_eq!(server.request_timeout, Duration::from_secs(2));
        assert_eq!(server.shutdown_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_debug_masks_secret() {
        let server = WebhookServer::new(Arc::new(WebhookManager::new())).with_secret("hunter2");
        assert!(!format!("{server:?}").contains("hunter2"));
    }
}
