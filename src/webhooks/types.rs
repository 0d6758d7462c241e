//! Webhook event and handler types.

use std::error::Error;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A boxed future, used for the return type of [`WebhookHandler::handle_event`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The error a handler may return.
pub type HandlerError = Box<dyn Error + Send + Sync + 'static>;

/// An event delivered by the Firefly III webhook system.
///
/// Events are immutable once parsed; handlers receive them behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use firefly_client::webhooks::WebhookEvent;
///
/// let event: WebhookEvent = serde_json::from_str(r#"{
///     "id": "evt-1",
///     "type": "STORE_TRANSACTION",
///     "timestamp": "2024-03-01T12:00:00Z",
///     "data": {"amount": "12.50"}
/// }"#).unwrap();
///
/// assert_eq!(event.event_type, "STORE_TRANSACTION");
/// assert_eq!(event.data["amount"], "12.50");
/// assert!(event.metadata.is_none());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Unique identifier of the event.
    pub id: String,
    /// The event type handlers are registered for.
    #[serde(rename = "type")]
    pub event_type: String,
    /// When the event occurred (RFC 3339).
    pub timestamp: DateTime<Utc>,
    /// The event payload.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Optional metadata attached by the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Reacts to webhook events of the type it is registered for.
///
/// Every handler registered for an event type runs concurrently with the
/// others; a failing handler does not stop the rest.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use firefly_client::webhooks::{BoxFuture, HandlerError, WebhookEvent, WebhookHandler};
///
/// struct AuditLog;
///
/// impl WebhookHandler for AuditLog {
///     fn handle_event(&self, event: Arc<WebhookEvent>) -> BoxFuture<'_, Result<(), HandlerError>> {
///         Box::pin(async move {
///             println!("received {}", event.id);
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait WebhookHandler: Send + Sync {
    /// Handles one event.
    fn handle_event(&self, event: Arc<WebhookEvent>) -> BoxFuture<'_, Result<(), HandlerError>>;
}

/// Adapts an async closure into a [`WebhookHandler`].
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    /// Wraps `f`.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F, Fut> WebhookHandler for HandlerFn<F>
where
    F: Fn(Arc<WebhookEvent>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    fn handle_event(&self, event: Arc<WebhookEvent>) -> BoxFuture<'_, Result<(), HandlerError>> {
        Box::pin((self.f)(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_parses_metadata() {
        let event: WebhookEvent = serde_json::from_str(
            r#"{"id":"1","type":"UPDATE_TRANSACTION","timestamp":"2024-01-02T03:04:05+02:00",
                "data":{},"metadata":{"source":"rule"}}"#,
        )
        .unwrap();

        assert_eq!(event.timestamp.to_rfc3339(), "2024-01-02T01:04:05+00:00");
        assert_eq!(event.metadata.unwrap()["source"], "rule");
    }

    #[test]
    fn test_event_requires_type() {
        let result: Result<WebhookEvent, _> =
            serde_json::from_str(r#"{"id":"1","timestamp":"2024-01-02T03:04:05Z","data":{}}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_handler_fn_invokes_closure() {
        let handler = HandlerFn::new(|event: Arc<WebhookEvent>| async move {
            if event.id == "bad" {
                Err::<(), HandlerError>("rejected".into())
            } else {
                Ok(())
            }
        });
        let event = WebhookEvent {
            id: "bad".to_string(),
            event_type: "t".to_string(),
            timestamp: Utc::now(),
            data: Map::new(),
            metadata: None,
        };

        let error = handler.handle_event(Arc::new(event)).await.unwrap_err();
        assert_eq!(error.to_string(), "rejected");
    }
}
